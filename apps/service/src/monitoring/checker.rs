use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::config::{Environment, HttpConfig};
use crate::database::models::Endpoint;
use crate::error::MonitorError;

use super::types::ProbeFailure;

/// What a checker saw on the wire, before the executor judges it
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Time from issuing the request until the response head arrived or the failure
    pub elapsed: Duration,
    /// Received status code, or why no response was received
    pub status: Result<u16, ProbeFailure>,
}

impl Observation {
    pub fn responded(elapsed: Duration, status_code: u16) -> Self {
        Self { elapsed, status: Ok(status_code) }
    }

    pub fn failed(elapsed: Duration, failure: ProbeFailure) -> Self {
        Self { elapsed, status: Err(failure) }
    }
}

/// Transport seam for probes
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    /// Perform one request against the endpoint, bounded by its timeout
    async fn check(&self, endpoint: &Endpoint) -> Observation;
}

/// HTTP/HTTPS checker sharing one connection pool across all endpoints
pub struct HttpChecker {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpChecker {
    pub fn new(config: &HttpConfig, environment: Environment) -> Result<Self, MonitorError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| MonitorError::Config(format!("Invalid header name '{name}': {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| MonitorError::Config(format!("Invalid value for header '{name}': {e}")))?;
            headers.insert(header_name, header_value);
        }

        let mut builder =
            reqwest::Client::builder().user_agent(config.user_agent.as_str()).default_headers(headers);

        if config.danger_accept_invalid_certs {
            if environment == Environment::Production {
                return Err(MonitorError::Config(
                    "refusing to disable TLS certificate verification in production".into(),
                ));
            }
            warn!(
                environment = %environment,
                "TLS certificate verification is DISABLED for all outbound probes. \
                 Only use this for local testing."
            );
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| MonitorError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client, config.max_response_body_bytes))
    }

    pub fn with_client(client: reqwest::Client, max_body_bytes: usize) -> Self {
        Self { client, max_body_bytes }
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn check(&self, endpoint: &Endpoint) -> Observation {
        let budget = endpoint.timeout();
        let request = self
            .client
            .request(endpoint.method.into(), endpoint.url.as_str())
            .timeout(budget);

        let start = Instant::now();
        let sent = timeout(budget, request.send()).await;
        let elapsed = start.elapsed();

        let response = match sent {
            Err(_) => {
                return Observation::failed(elapsed, ProbeFailure::Timeout { timeout_ms: endpoint.timeout_ms });
            }
            Ok(Err(e)) => return Observation::failed(elapsed, classify_request_error(&e, endpoint.timeout_ms)),
            Ok(Ok(response)) => response,
        };

        let status_code = response.status().as_u16();
        drain_body(response, self.max_body_bytes, budget.saturating_sub(elapsed)).await;

        Observation::responded(elapsed, status_code)
    }
}

/// Read up to `limit` body bytes so the connection can go back to the pool.
/// Oversized or slow bodies are cut off by dropping the response.
async fn drain_body(mut response: reqwest::Response, limit: usize, budget: Duration) {
    let drain = async move {
        let mut read = 0usize;
        while read < limit {
            match response.chunk().await {
                Ok(Some(chunk)) => read += chunk.len(),
                Ok(None) => break,
                Err(e) => {
                    trace!("Body read stopped early: {}", e);
                    break;
                }
            }
        }
        read
    };

    match timeout(budget, drain).await {
        Ok(read) if read >= limit => debug!("Response body exceeded {} bytes, connection dropped", limit),
        Ok(read) => trace!("Drained {} body bytes", read),
        Err(_) => debug!("Response body not finished within the probe timeout"),
    }
}

fn classify_request_error(error: &reqwest::Error, timeout_ms: u64) -> ProbeFailure {
    if error.is_timeout() {
        ProbeFailure::Timeout { timeout_ms }
    } else if error.is_builder() {
        // Malformed URL or a request reqwest refused to build
        ProbeFailure::UnexpectedError(error_chain(error))
    } else {
        ProbeFailure::TransportFailure(error_chain(error))
    }
}

/// Flatten an error and its sources into one line
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::HttpMethod;

    fn checker() -> HttpChecker {
        HttpChecker::new(&HttpConfig::default(), Environment::Test).unwrap()
    }

    #[test]
    fn test_insecure_tls_refused_in_production() {
        let config = HttpConfig { danger_accept_invalid_certs: true, ..HttpConfig::default() };
        assert!(HttpChecker::new(&config, Environment::Production).is_err());
        assert!(HttpChecker::new(&config, Environment::Development).is_ok());
    }

    #[test]
    fn test_invalid_default_header_rejected() {
        let mut config = HttpConfig::default();
        config.default_headers.insert("bad header".into(), "x".into());
        assert!(matches!(HttpChecker::new(&config, Environment::Test), Err(MonitorError::Config(_))));
    }

    #[tokio::test]
    async fn test_malformed_url_is_unexpected_error() {
        let endpoint = Endpoint::new("broken", "not a url", HttpMethod::Get);
        let observation = checker().check(&endpoint).await;
        assert!(matches!(observation.status, Err(ProbeFailure::UnexpectedError(_))));
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_failure() {
        let endpoint = Endpoint::new("closed", "http://127.0.0.1:1/", HttpMethod::Get);
        let observation = checker().check(&endpoint).await;
        assert!(matches!(observation.status, Err(ProbeFailure::TransportFailure(_))));
    }
}
