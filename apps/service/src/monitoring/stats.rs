//! Health and latency summaries derived from probe history.
//!
//! Summaries are recomputed from the full stored history on every read;
//! nothing is cached between calls.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::ProbeResult;
use crate::database::Database;
use crate::database::models::Endpoint;
use crate::error::{MonitorError, MonitorResult};

/// Number of recent successful latencies kept for trend display
pub const TREND_WINDOW: usize = 10;

/// Point-in-time health summary of one endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub endpoint_id: i64,
    pub endpoint_name: String,
    pub url: String,
    /// Success flag of the most recent probe
    pub is_healthy: Option<bool>,
    /// Latency of the most recent successful probe
    pub latest_response_time: Option<u64>,
    pub average_response_time: Option<u64>,
    pub min_response_time: Option<u64>,
    pub max_response_time: Option<u64>,
    /// Most recent successful latencies, newest first
    pub recent_response_times: Vec<u64>,
    /// Percentage of successful probes; absent while there are none
    pub uptime: Option<f64>,
    pub total_checks: u64,
    pub successful_checks: u64,
    pub last_check_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl StatsSummary {
    pub fn formatted_latest_response_time(&self) -> String {
        format_ms(self.latest_response_time)
    }

    pub fn formatted_average_response_time(&self) -> String {
        format_ms(self.average_response_time)
    }

    pub fn formatted_min_response_time(&self) -> String {
        format_ms(self.min_response_time)
    }

    pub fn formatted_max_response_time(&self) -> String {
        format_ms(self.max_response_time)
    }

    pub fn formatted_uptime(&self) -> String {
        self.uptime.map(|uptime| format!("{uptime:.1}%")).unwrap_or_else(|| "N/A".to_string())
    }

    /// "min-maxms", or "N/A" without successful probes
    pub fn response_time_range(&self) -> String {
        match (self.min_response_time, self.max_response_time) {
            (Some(min), Some(max)) => format!("{min}-{max}ms"),
            _ => "N/A".to_string(),
        }
    }
}

fn format_ms(value: Option<u64>) -> String {
    value.map(|ms| format!("{ms}ms")).unwrap_or_else(|| "N/A".to_string())
}

/// Summarize an endpoint's history. `history` must be ordered newest first.
pub fn summarize(endpoint: &Endpoint, history: &[ProbeResult]) -> StatsSummary {
    let latest = history.first();

    let successful: Vec<u64> = history
        .iter()
        .filter(|result| result.success)
        .map(|result| result.response_time_ms)
        .collect();

    let total_checks = history.len() as u64;
    let successful_checks = successful.len() as u64;

    let average_response_time = if successful.is_empty() {
        None
    } else {
        let sum: u128 = successful.iter().map(|&ms| u128::from(ms)).sum();
        Some((sum / successful.len() as u128) as u64)
    };

    let uptime = (total_checks > 0)
        .then(|| successful_checks as f64 / total_checks as f64 * 100.0);

    StatsSummary {
        endpoint_id: endpoint.id_or_default(),
        endpoint_name: endpoint.name.clone(),
        url: endpoint.url.clone(),
        is_healthy: latest.map(|result| result.success),
        latest_response_time: successful.first().copied(),
        average_response_time,
        min_response_time: successful.iter().min().copied(),
        max_response_time: successful.iter().max().copied(),
        recent_response_times: successful.iter().take(TREND_WINDOW).copied().collect(),
        uptime,
        total_checks,
        successful_checks,
        last_check_time: latest.map(|result| result.checked_at),
        last_error: latest.and_then(|result| result.error_message.clone()),
    }
}

/// Pull-based aggregator over the stored probe history
pub struct StatsAggregator {
    database: Arc<dyn Database>,
}

impl StatsAggregator {
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self { database }
    }

    /// Summary for one endpoint
    pub async fn get_stats(&self, endpoint_id: i64) -> MonitorResult<StatsSummary> {
        let endpoint = self
            .database
            .get_endpoint(endpoint_id)
            .await?
            .ok_or(MonitorError::EndpointNotFound(endpoint_id))?;

        self.summarize_endpoint(&endpoint).await
    }

    /// Summaries for every endpoint, active or not
    pub async fn get_all_stats(&self) -> MonitorResult<Vec<StatsSummary>> {
        let endpoints = self.database.list_endpoints().await?;
        self.summarize_all(&endpoints).await
    }

    /// Summaries for active endpoints only
    pub async fn get_active_stats(&self) -> MonitorResult<Vec<StatsSummary>> {
        let endpoints = self.database.list_active_endpoints().await?;
        self.summarize_all(&endpoints).await
    }

    async fn summarize_endpoint(&self, endpoint: &Endpoint) -> MonitorResult<StatsSummary> {
        let history = self.database.list_results(endpoint.id_or_default()).await?;
        Ok(summarize(endpoint, &history))
    }

    async fn summarize_all(&self, endpoints: &[Endpoint]) -> MonitorResult<Vec<StatsSummary>> {
        let mut summaries = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            summaries.push(self.summarize_endpoint(endpoint).await?);
        }
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::{HttpMethod, ProbeFailure};
    use chrono::Duration;

    fn endpoint() -> Endpoint {
        let mut endpoint = Endpoint::new("Users", "https://jsonplaceholder.typicode.com/users", HttpMethod::Get);
        endpoint.id = Some(3);
        endpoint
    }

    /// Build a newest-first history from (success, latency) pairs given oldest first
    fn history(entries: &[(bool, u64)]) -> Vec<ProbeResult> {
        let base = Utc::now() - Duration::hours(1);
        let mut results: Vec<ProbeResult> = entries
            .iter()
            .enumerate()
            .map(|(i, &(success, latency))| {
                let result = if success {
                    ProbeResult::succeeded(3, latency, 200)
                } else {
                    ProbeResult::failed(3, latency, &ProbeFailure::UnexpectedStatus { expected: 200, actual: 503 })
                };
                result.at(base + Duration::seconds(i as i64))
            })
            .collect();
        results.reverse();
        results
    }

    #[test]
    fn test_empty_history() {
        let stats = summarize(&endpoint(), &[]);

        assert_eq!(stats.endpoint_id, 3);
        assert_eq!(stats.is_healthy, None);
        assert_eq!(stats.uptime, None);
        assert_eq!(stats.latest_response_time, None);
        assert_eq!(stats.average_response_time, None);
        assert_eq!(stats.min_response_time, None);
        assert_eq!(stats.max_response_time, None);
        assert!(stats.recent_response_times.is_empty());
        assert_eq!(stats.total_checks, 0);
        assert_eq!(stats.successful_checks, 0);
        assert_eq!(stats.last_error, None);
        assert_eq!(stats.response_time_range(), "N/A");
        assert_eq!(stats.formatted_min_response_time(), "N/A");
        assert_eq!(stats.formatted_max_response_time(), "N/A");
    }

    #[test]
    fn test_latency_only_counts_successes() {
        let stats = summarize(
            &endpoint(),
            &history(&[(false, 900), (true, 100), (false, 5000), (true, 200), (false, 1)]),
        );

        assert_eq!(stats.total_checks, 5);
        assert_eq!(stats.successful_checks, 2);
        assert_eq!(stats.average_response_time, Some(150));
        assert_eq!(stats.min_response_time, Some(100));
        assert_eq!(stats.max_response_time, Some(200));
        assert_eq!(stats.latest_response_time, Some(200));
        assert_eq!(stats.recent_response_times, vec![200, 100]);
        assert_eq!(stats.uptime, Some(40.0));
        assert_eq!(stats.is_healthy, Some(false));
        assert_eq!(stats.last_error.as_deref(), Some("Expected status 200 but got 503"));
        assert_eq!(stats.formatted_uptime(), "40.0%");
        assert_eq!(stats.response_time_range(), "100-200ms");
        assert_eq!(stats.formatted_min_response_time(), "100ms");
        assert_eq!(stats.formatted_max_response_time(), "200ms");
        assert_eq!(stats.formatted_average_response_time(), "150ms");
    }

    #[test]
    fn test_fully_failing_endpoint() {
        let stats = summarize(&endpoint(), &history(&[(false, 10), (false, 20)]));

        assert_eq!(stats.uptime, Some(0.0));
        assert_eq!(stats.is_healthy, Some(false));
        assert_eq!(stats.average_response_time, None);
        assert_eq!(stats.min_response_time, None);
        assert_eq!(stats.max_response_time, None);
        assert!(stats.recent_response_times.is_empty());
        assert_eq!(stats.formatted_average_response_time(), "N/A");
    }

    #[test]
    fn test_average_truncates() {
        let stats = summarize(&endpoint(), &history(&[(true, 100), (true, 101)]));
        assert_eq!(stats.average_response_time, Some(100));
    }

    #[test]
    fn test_trend_window_is_newest_first_and_capped() {
        let entries: Vec<(bool, u64)> = (1..=15).map(|latency| (true, latency)).collect();
        let stats = summarize(&endpoint(), &history(&entries));

        assert_eq!(stats.recent_response_times.len(), TREND_WINDOW);
        assert_eq!(stats.recent_response_times, vec![15, 14, 13, 12, 11, 10, 9, 8, 7, 6]);
        assert_eq!(stats.is_healthy, Some(true));
        assert_eq!(stats.uptime, Some(100.0));
        assert_eq!(stats.last_error, None);
    }

    #[test]
    fn test_uptime_keeps_precision() {
        let stats = summarize(&endpoint(), &history(&[(true, 1), (true, 1), (false, 1)]));
        let uptime = stats.uptime.unwrap();

        assert!((uptime - 200.0 / 3.0).abs() < 1e-9);
        assert!(stats.successful_checks <= stats.total_checks);
        assert_eq!(stats.formatted_uptime(), "66.7%");
    }
}
