use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// HTTP methods an endpoint may be probed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        HttpMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == upper)
            .ok_or_else(|| format!("Unsupported HTTP method: {s}"))
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Terminal state of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    Succeeded,
    Timeout,
    Transport,
    UnexpectedStatus,
    Unexpected,
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Succeeded => write!(f, "succeeded"),
            ProbeOutcome::Timeout => write!(f, "timeout"),
            ProbeOutcome::Transport => write!(f, "transport"),
            ProbeOutcome::UnexpectedStatus => write!(f, "unexpected_status"),
            ProbeOutcome::Unexpected => write!(f, "unexpected"),
        }
    }
}

impl FromStr for ProbeOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "succeeded" => Ok(ProbeOutcome::Succeeded),
            "timeout" => Ok(ProbeOutcome::Timeout),
            "transport" => Ok(ProbeOutcome::Transport),
            "unexpected_status" => Ok(ProbeOutcome::UnexpectedStatus),
            "unexpected" => Ok(ProbeOutcome::Unexpected),
            other => Err(format!("Unknown probe outcome: {other}")),
        }
    }
}

/// Why a probe did not succeed.
///
/// The `Display` output is what ends up in `ProbeResult::error_message`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Request failed: {0}")]
    TransportFailure(String),

    #[error("Expected status {expected} but got {actual}")]
    UnexpectedStatus { expected: u16, actual: u16 },

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl ProbeFailure {
    pub fn outcome(&self) -> ProbeOutcome {
        match self {
            ProbeFailure::Timeout { .. } => ProbeOutcome::Timeout,
            ProbeFailure::TransportFailure(_) => ProbeOutcome::Transport,
            ProbeFailure::UnexpectedStatus { .. } => ProbeOutcome::UnexpectedStatus,
            ProbeFailure::UnexpectedError(_) => ProbeOutcome::Unexpected,
        }
    }

    /// Status code observed on the wire, if the failure happened after a response arrived
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProbeFailure::UnexpectedStatus { actual, .. } => Some(*actual),
            _ => None,
        }
    }
}

/// Outcome of one probe attempt against one endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Row id, set once the result has been persisted
    pub id: Option<i64>,

    /// Endpoint that was probed
    pub endpoint_id: i64,

    /// HTTP status code, absent if no response was received
    pub status_code: Option<u16>,

    /// Time until the response head arrived, or until the failure
    pub response_time_ms: u64,

    pub outcome: ProbeOutcome,

    /// True iff a response arrived with the expected status
    pub success: bool,

    /// Present iff `success` is false
    pub error_message: Option<String>,

    /// When the probe reached its terminal state
    pub checked_at: DateTime<Utc>,
}

impl ProbeResult {
    /// Build a successful result
    pub fn succeeded(endpoint_id: i64, response_time_ms: u64, status_code: u16) -> Self {
        Self {
            id: None,
            endpoint_id,
            status_code: Some(status_code),
            response_time_ms,
            outcome: ProbeOutcome::Succeeded,
            success: true,
            error_message: None,
            checked_at: Utc::now(),
        }
    }

    /// Build a failed result from its classified cause
    pub fn failed(endpoint_id: i64, response_time_ms: u64, failure: &ProbeFailure) -> Self {
        Self {
            id: None,
            endpoint_id,
            status_code: failure.status_code(),
            response_time_ms,
            outcome: failure.outcome(),
            success: false,
            error_message: Some(failure.to_string()),
            checked_at: Utc::now(),
        }
    }

    pub fn at(mut self, checked_at: DateTime<Utc>) -> Self {
        self.checked_at = checked_at;
        self
    }
}
