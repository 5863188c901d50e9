use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::{info, warn};

use super::checker::{Checker, HttpChecker, Observation};
use super::types::{ProbeFailure, ProbeResult};
use crate::config::Config;
use crate::database::models::Endpoint;
use crate::error::MonitorError;

/// Probe executor - runs one bounded probe and turns whatever happens into a `ProbeResult`
pub struct ProbeExecutor {
    checker: Arc<dyn Checker>,
}

impl ProbeExecutor {
    pub fn new(checker: Arc<dyn Checker>) -> Self {
        Self { checker }
    }

    /// Build an executor with the shared HTTP transport described by `config`
    pub fn from_config(config: &Config) -> Result<Self, MonitorError> {
        let checker = HttpChecker::new(&config.http, config.environment)?;
        Ok(Self::new(Arc::new(checker)))
    }

    /// Probe an endpoint once. Never fails and never panics: every failure
    /// mode comes back as an unsuccessful result.
    pub async fn execute(&self, endpoint: &Endpoint) -> ProbeResult {
        let endpoint_id = endpoint.id_or_default();
        let start = Instant::now();

        let observation = AssertUnwindSafe(self.checker.check(endpoint)).catch_unwind().await;

        let result = match observation {
            Ok(Observation { elapsed, status: Ok(code) }) if code == endpoint.expected_status => {
                ProbeResult::succeeded(endpoint_id, as_millis(elapsed), code)
            }
            Ok(Observation { elapsed, status: Ok(code) }) => ProbeResult::failed(
                endpoint_id,
                as_millis(elapsed),
                &ProbeFailure::UnexpectedStatus { expected: endpoint.expected_status, actual: code },
            ),
            Ok(Observation { elapsed, status: Err(failure) }) => {
                ProbeResult::failed(endpoint_id, as_millis(elapsed), &failure)
            }
            Err(panic) => ProbeResult::failed(
                endpoint_id,
                as_millis(start.elapsed()),
                &ProbeFailure::UnexpectedError(panic_message(panic.as_ref())),
            ),
        };

        if result.success {
            info!(
                "Health check completed for {}: Status={}, ResponseTime={}ms",
                endpoint.name,
                result.status_code.unwrap_or_default(),
                result.response_time_ms
            );
        } else {
            warn!(
                outcome = %result.outcome,
                "Health check failed for {} after {}ms: {}",
                endpoint.name,
                result.response_time_ms,
                result.error_message.as_deref().unwrap_or("unknown error")
            );
        }

        result
    }
}

fn as_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("probe panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("probe panicked: {message}")
    } else {
        "probe panicked".to_string()
    }
}
