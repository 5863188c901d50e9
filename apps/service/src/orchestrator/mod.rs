//! Orchestrator module - wires the monitoring engine together
//!
//! The `Monitor` facade owns the store, the probe executor, the scheduler,
//! the stats aggregator and retention cleanup, and exposes the operations
//! the CLI and the HTTP API call.
pub mod retention;


pub use retention::{RetentionCleanup, RetentionPolicy};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::database::{Database, DatabaseImpl, initialize_database};
use crate::endpoints::EndpointService;
use crate::error::{MonitorError, MonitorResult};
use crate::monitoring::{MonitoringScheduler, ProbeExecutor, ProbeResult, StatsAggregator, StatsSummary};
use crate::pool::open_pool;

/// Background tasks started by `Monitor::start`
pub struct BackgroundTasks {
    pub scheduler: JoinHandle<()>,
    pub retention: JoinHandle<()>,
}

impl BackgroundTasks {
    /// Wait for both loops to exit after their shutdown token was cancelled
    pub async fn join(self) {
        if let Err(e) = self.scheduler.await {
            warn!("Scheduler task ended abnormally: {}", e);
        }
        if let Err(e) = self.retention.await {
            warn!("Retention task ended abnormally: {}", e);
        }
    }
}

/// Entry point to the monitoring engine
pub struct Monitor {
    database: Arc<dyn Database>,
    endpoints: EndpointService,
    scheduler: Arc<MonitoringScheduler>,
    stats: StatsAggregator,
    retention: RetentionCleanup,
}

impl Monitor {
    /// Open the configured database, run migrations and build the engine
    pub async fn open(config: &Config) -> MonitorResult<Self> {
        info!("Opening database at {}", config.database.path);
        let pool = open_pool(&config.database.path, config.database.max_connections).await?;

        {
            let conn = pool
                .get()
                .await
                .map_err(|e| anyhow!("Failed to get database connection: {e}"))?;
            initialize_database(&conn).await?;
        }

        let database: Arc<dyn Database> = Arc::new(DatabaseImpl::new_from_pool(pool));
        let executor = Arc::new(ProbeExecutor::from_config(config)?);

        Ok(Self::new(config, database, executor))
    }

    /// Build the engine from already constructed parts
    pub fn new(config: &Config, database: Arc<dyn Database>, executor: Arc<ProbeExecutor>) -> Self {
        let scheduler = Arc::new(MonitoringScheduler::new(executor, Arc::clone(&database), &config.scheduler));
        let retention = RetentionCleanup::new(Arc::clone(&database), RetentionPolicy::from(&config.retention));

        Self {
            endpoints: EndpointService::new(Arc::clone(&database)),
            stats: StatsAggregator::new(Arc::clone(&database)),
            database,
            scheduler,
            retention,
        }
    }

    pub fn endpoints(&self) -> &EndpointService {
        &self.endpoints
    }

    /// Probe one endpoint right away, regardless of the schedule or its active flag
    pub async fn trigger_check(&self, endpoint_id: i64) -> MonitorResult<ProbeResult> {
        let endpoint = self.endpoints.get(endpoint_id).await?;
        self.scheduler.probe_endpoint(&endpoint).await
    }

    /// Run a full health-check tick right away
    pub async fn trigger_all_checks(&self) -> MonitorResult<Vec<ProbeResult>> {
        self.scheduler.run_tick().await
    }

    pub async fn get_stats(&self, endpoint_id: i64) -> MonitorResult<StatsSummary> {
        self.stats.get_stats(endpoint_id).await
    }

    pub async fn get_all_stats(&self) -> MonitorResult<Vec<StatsSummary>> {
        self.stats.get_all_stats().await
    }

    pub async fn get_active_stats(&self) -> MonitorResult<Vec<StatsSummary>> {
        self.stats.get_active_stats().await
    }

    /// Probe history of an endpoint, newest first
    pub async fn history(&self, endpoint_id: i64) -> MonitorResult<Vec<ProbeResult>> {
        self.ensure_exists(endpoint_id).await?;
        Ok(self.database.list_results(endpoint_id).await?)
    }

    /// Probe history at or after `since`, newest first
    pub async fn history_since(
        &self,
        endpoint_id: i64,
        since: DateTime<Utc>,
    ) -> MonitorResult<Vec<ProbeResult>> {
        self.ensure_exists(endpoint_id).await?;
        Ok(self.database.list_results_since(endpoint_id, since).await?)
    }

    /// Most recent probe result of an endpoint, if it was ever probed
    pub async fn latest_result(&self, endpoint_id: i64) -> MonitorResult<Option<ProbeResult>> {
        self.ensure_exists(endpoint_id).await?;
        Ok(self.database.latest_result(endpoint_id).await?)
    }

    /// Run one retention pass now
    pub async fn cleanup_expired_results(&self) -> MonitorResult<u64> {
        Ok(self.retention.cleanup_expired_results().await?)
    }

    /// Start the scheduler and the retention loop; both stop when `shutdown` is cancelled
    pub fn start(&self, shutdown: CancellationToken) -> BackgroundTasks {
        let policy = self.retention.policy();
        info!(
            "Starting retention cleanup: keeping {} days, running every {:?}",
            policy.result_days, policy.cleanup_interval
        );

        BackgroundTasks {
            scheduler: Arc::clone(&self.scheduler).start(shutdown.clone()),
            retention: self.retention.start_periodic_cleanup(shutdown),
        }
    }

    async fn ensure_exists(&self, endpoint_id: i64) -> MonitorResult<()> {
        match self.database.get_endpoint(endpoint_id).await? {
            Some(_) => Ok(()),
            None => Err(MonitorError::EndpointNotFound(endpoint_id)),
        }
    }
}
