//! Automatic retention and cleanup of probe results.
//!
//! Results older than the retention age (7 days by default) are deleted by a
//! background task that runs once per cleanup interval (daily by default).

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RetentionConfig;
use crate::database::Database;

/// Retention policy for probe results
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Days to keep probe results
    pub result_days: i64,
    /// Time between cleanup passes
    pub cleanup_interval: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { result_days: 7, cleanup_interval: Duration::from_secs(24 * 3600) }
    }
}

impl From<&RetentionConfig> for RetentionPolicy {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            result_days: config.retention_days,
            cleanup_interval: Duration::from_secs(config.cleanup_interval_hours.saturating_mul(3600)),
        }
    }
}

impl RetentionPolicy {
    /// Oldest timestamp that survives a cleanup run at `now`
    pub fn cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        chrono::Duration::try_days(self.result_days)
            .and_then(|retention| now.checked_sub_signed(retention))
            .ok_or_else(|| anyhow!("Retention of {} days is out of range", self.result_days))
    }
}

/// Cleanup manager for expired results
pub struct RetentionCleanup {
    database: Arc<dyn Database>,
    policy: RetentionPolicy,
}

impl RetentionCleanup {
    /// Create a new retention cleanup manager
    pub fn new(database: Arc<dyn Database>, policy: RetentionPolicy) -> Self {
        Self { database, policy }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Delete results that fell out of the retention window
    pub async fn cleanup_expired_results(&self) -> Result<u64> {
        self.cleanup_older_than(self.policy.cutoff(Utc::now())?).await
    }

    /// Delete results checked strictly before `cutoff`
    pub async fn cleanup_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        info!("Starting cleanup of probe results older than {}", cutoff.to_rfc3339());

        let deleted = self.database.delete_results_older_than(cutoff).await?;

        info!("Completed cleanup of old probe results: {} deleted", deleted);
        Ok(deleted)
    }

    /// Start the background cleanup task. The first pass runs immediately.
    pub fn start_periodic_cleanup(&self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        let database = Arc::clone(&self.database);
        let policy = self.policy.clone();

        tokio::spawn(async move {
            let cleanup = RetentionCleanup::new(database, policy);
            let mut interval = tokio::time::interval(cleanup.policy.cleanup_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }

                match cleanup.cleanup_expired_results().await {
                    Ok(count) => {
                        debug!("Periodic results cleanup completed: {} deleted", count);
                    }
                    Err(e) => {
                        warn!("Periodic results cleanup failed, retrying next period: {:#}", e);
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_policy_defaults() {
        let policy = RetentionPolicy::default();
        assert_eq!(policy.result_days, 7);
        assert_eq!(policy.cleanup_interval, Duration::from_secs(86_400));
    }

    #[test]
    fn test_cutoff_calculation() {
        let policy = RetentionPolicy::default();
        let now = Utc::now();
        assert_eq!(now - policy.cutoff(now).unwrap(), chrono::Duration::days(7));
    }

    #[test]
    fn test_policy_from_config() {
        let config = RetentionConfig { retention_days: 14, cleanup_interval_hours: 6 };
        let policy = RetentionPolicy::from(&config);
        let now = Utc::now();
        assert_eq!(now - policy.cutoff(now).unwrap(), chrono::Duration::days(14));
        assert_eq!(policy.cleanup_interval, Duration::from_secs(6 * 3600));
    }

    #[test]
    fn test_out_of_range_retention_is_an_error() {
        let policy = RetentionPolicy { result_days: 200_000_000, ..RetentionPolicy::default() };
        let err = policy.cutoff(Utc::now()).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
