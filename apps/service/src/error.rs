use thiserror::Error;

/// Errors surfaced by the engine's public operations.
///
/// Probe failures never show up here: they are recorded as failed
/// `ProbeResult`s instead.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Endpoint not found with id: {0}")]
    EndpointNotFound(i64),

    #[error("Invalid endpoint: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl MonitorError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, MonitorError::EndpointNotFound(_))
    }
}

pub type MonitorResult<T> = std::result::Result<T, MonitorError>;
