use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::monitoring::types::HttpMethod;

pub const DEFAULT_EXPECTED_STATUS: u16 = 200;
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 30_000;

/// Url, method, expected status, timeout and interval of an endpoint
pub type ProbeFingerprint = (String, HttpMethod, u16, u64, u64);

/// Endpoint model - an HTTP target under monitoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: Option<i64>,
    pub name: String,
    pub url: String,
    pub method: HttpMethod,
    pub expected_status: u16,
    pub timeout_ms: u64,
    pub check_interval_ms: u64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Endpoint {
    /// Create a new, not yet persisted endpoint with default timing
    pub fn new(name: impl Into<String>, url: impl Into<String>, method: HttpMethod) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: name.into(),
            url: url.into(),
            method,
            expected_status: DEFAULT_EXPECTED_STATUS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// Id of a persisted endpoint; 0 for one that was never saved
    pub fn id_or_default(&self) -> i64 {
        self.id.unwrap_or_default()
    }

    /// Everything a running probe timer depends on. Two endpoints with the
    /// same fingerprint are probed identically.
    pub fn probe_fingerprint(&self) -> ProbeFingerprint {
        (
            self.url.clone(),
            self.method,
            self.expected_status,
            self.timeout_ms,
            self.check_interval_ms,
        )
    }
}

/// Create/update payload for an endpoint, with the same defaults a new
/// endpoint gets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointRequest {
    pub name: String,
    pub url: String,
    pub method: String,
    pub expected_status: u16,
    pub timeout_ms: u64,
    pub check_interval_ms: u64,
    pub active: bool,
}

impl Default for EndpointRequest {
    fn default() -> Self {
        Self {
            name: String::new(),
            url: String::new(),
            method: HttpMethod::Get.to_string(),
            expected_status: DEFAULT_EXPECTED_STATUS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            active: true,
        }
    }
}

impl EndpointRequest {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self { name: name.into(), url: url.into(), ..Self::default() }
    }
}

/// Convert a timestamp to the millisecond integer stored in the database
pub fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

/// Convert a stored millisecond integer back to a timestamp
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
