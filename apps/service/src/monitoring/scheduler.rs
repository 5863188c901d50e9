use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::executor::ProbeExecutor;
use super::types::{ProbeFailure, ProbeResult};
use crate::config::{ScheduleMode, SchedulerConfig};
use crate::database::Database;
use crate::database::models::{Endpoint, ProbeFingerprint};
use crate::error::MonitorResult;

/// A per-endpoint timer owned by the reconciler
struct EndpointTimer {
    fingerprint: ProbeFingerprint,
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

/// Monitoring scheduler - decides when endpoints are probed and persists the results
pub struct MonitoringScheduler {
    executor: Arc<ProbeExecutor>,
    database: Arc<dyn Database>,
    limiter: Arc<Semaphore>,
    tick_interval: Duration,
    mode: ScheduleMode,
}

impl MonitoringScheduler {
    /// Create a new monitoring scheduler
    pub fn new(
        executor: Arc<ProbeExecutor>,
        database: Arc<dyn Database>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            executor,
            database,
            limiter: Arc::new(Semaphore::new(config.max_concurrent_probes.max(1))),
            tick_interval: config.check_interval(),
            mode: config.schedule_mode,
        }
    }

    /// Probe one endpoint now and persist the result
    pub async fn probe_endpoint(&self, endpoint: &Endpoint) -> MonitorResult<ProbeResult> {
        let mut result = {
            let _permit = self.limiter.acquire().await;
            self.executor.execute(endpoint).await
        };
        result.id = Some(self.database.append_result(&result).await?);
        Ok(result)
    }

    /// One health-check tick: snapshot the active endpoints and probe them all
    pub async fn run_tick(&self) -> MonitorResult<Vec<ProbeResult>> {
        info!("Starting scheduled health checks");

        let endpoints = self.database.list_active_endpoints().await?;
        let count = endpoints.len();
        let results = self.probe_endpoints(endpoints).await;

        let healthy = results.iter().filter(|result| result.success).count();
        info!(
            "Completed scheduled health checks for {} endpoints ({} healthy, {} unhealthy)",
            count,
            healthy,
            results.len() - healthy
        );

        Ok(results)
    }

    /// Probe endpoints concurrently, bounded by the probe limiter, and persist
    /// each result as it completes. Returns once every probe has finished.
    /// Always yields exactly one result per endpoint.
    pub async fn probe_endpoints(&self, endpoints: Vec<Endpoint>) -> Vec<ProbeResult> {
        let mut tasks = JoinSet::new();
        let mut in_flight = HashMap::new();

        for endpoint in endpoints {
            let executor = Arc::clone(&self.executor);
            let limiter = Arc::clone(&self.limiter);
            let probe_target = endpoint.clone();

            let handle = tasks.spawn(async move {
                let _permit = limiter.acquire_owned().await;
                executor.execute(&probe_target).await
            });
            in_flight.insert(handle.id(), (endpoint, Instant::now()));
        }

        let mut results = Vec::with_capacity(in_flight.len());

        while let Some(joined) = tasks.join_next_with_id().await {
            let (endpoint, mut result) = match joined {
                Ok((id, result)) => match in_flight.remove(&id) {
                    Some((endpoint, _)) => (endpoint, result),
                    None => continue,
                },
                Err(e) => {
                    let Some((endpoint, spawned_at)) = in_flight.remove(&e.id()) else { continue };
                    error!("Error performing health check for endpoint {}: {}", endpoint.name, e);
                    let result = failed_task_result(&endpoint, spawned_at, &e);
                    (endpoint, result)
                }
            };

            match self.database.append_result(&result).await {
                Ok(id) => result.id = Some(id),
                Err(e) => error!("Failed to persist probe result for endpoint {}: {:#}", endpoint.name, e),
            }
            results.push(result);
        }

        results
    }

    /// Spawn the scheduling loop. It runs until `shutdown` is cancelled.
    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            match self.mode {
                ScheduleMode::Global => self.run_global(shutdown).await,
                ScheduleMode::PerEndpoint => self.run_per_endpoint(shutdown).await,
            }
        })
    }

    async fn run_global(&self, shutdown: CancellationToken) {
        info!("Scheduler started: probing all active endpoints every {:?}", self.tick_interval);

        let mut timer = interval(self.tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {
                    if let Err(e) = self.run_tick().await {
                        error!("Scheduled health checks failed: {}", e);
                    }
                }
            }
        }

        info!("Scheduler stopped");
    }

    async fn run_per_endpoint(&self, shutdown: CancellationToken) {
        info!(
            "Scheduler started: per-endpoint intervals, reconciling every {:?}",
            self.tick_interval
        );

        let (result_tx, mut result_rx) = mpsc::channel::<ProbeResult>(256);
        let database = Arc::clone(&self.database);

        // Single writer keeps each endpoint's results in completion order
        let writer = tokio::spawn(async move {
            while let Some(result) = result_rx.recv().await {
                if let Err(e) = database.append_result(&result).await {
                    error!("Failed to persist probe result for endpoint {}: {:#}", result.endpoint_id, e);
                }
            }
        });

        let mut timers: HashMap<i64, EndpointTimer> = HashMap::new();
        let mut reconcile = interval(self.tick_interval);
        reconcile.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = reconcile.tick() => {
                    self.reconcile_timers(&mut timers, &result_tx, &shutdown).await;
                }
            }
        }

        for (_, timer) in timers.drain() {
            timer.stop.cancel();
            let _ = timer.handle.await;
        }
        drop(result_tx);
        let _ = writer.await;

        info!("Scheduler stopped");
    }

    /// Bring the timer set in line with the currently active endpoints
    async fn reconcile_timers(
        &self,
        timers: &mut HashMap<i64, EndpointTimer>,
        result_tx: &mpsc::Sender<ProbeResult>,
        shutdown: &CancellationToken,
    ) {
        let active = match self.database.list_active_endpoints().await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                warn!("Failed to load active endpoints, keeping current timers: {:#}", e);
                return;
            }
        };

        let mut seen = HashSet::with_capacity(active.len());

        for endpoint in active {
            let Some(id) = endpoint.id else { continue };
            seen.insert(id);

            let fingerprint = endpoint.probe_fingerprint();
            if let Some(timer) = timers.get(&id) {
                if timer.fingerprint == fingerprint && !timer.handle.is_finished() {
                    continue;
                }
                debug!("Endpoint {} changed, restarting its timer", endpoint.name);
                if let Some(old) = timers.remove(&id) {
                    old.stop.cancel();
                }
            } else {
                debug!("Starting timer for endpoint {} every {}ms", endpoint.name, endpoint.check_interval_ms);
            }

            let stop = shutdown.child_token();
            let handle = self.spawn_endpoint_timer(endpoint, result_tx.clone(), stop.clone());
            timers.insert(id, EndpointTimer { fingerprint, stop, handle });
        }

        timers.retain(|id, timer| {
            if seen.contains(id) {
                true
            } else {
                debug!("Endpoint {} no longer active, stopping its timer", id);
                timer.stop.cancel();
                false
            }
        });
    }

    /// Probe a single endpoint on its own cadence. A stop request takes
    /// effect between probes; an in-flight probe always completes.
    fn spawn_endpoint_timer(
        &self,
        endpoint: Endpoint,
        result_tx: mpsc::Sender<ProbeResult>,
        stop: CancellationToken,
    ) -> JoinHandle<()> {
        let executor = Arc::clone(&self.executor);
        let limiter = Arc::clone(&self.limiter);

        tokio::spawn(async move {
            let mut timer = interval(endpoint.check_interval());
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = timer.tick() => {}
                }

                let result = {
                    let _permit = limiter.acquire().await;
                    executor.execute(&endpoint).await
                };

                if let Err(e) = result_tx.send(result).await {
                    error!("Failed to send probe result: {}", e);
                    break;
                }
            }
        })
    }
}

/// Result recorded for a probe whose task died before producing one
fn failed_task_result(endpoint: &Endpoint, spawned_at: Instant, error: &JoinError) -> ProbeResult {
    let elapsed = u64::try_from(spawned_at.elapsed().as_millis()).unwrap_or(u64::MAX);
    let failure = ProbeFailure::UnexpectedError(format!("probe task failed: {error}"));
    ProbeResult::failed(endpoint.id_or_default(), elapsed, &failure)
}
