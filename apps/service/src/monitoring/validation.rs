//! Validation of endpoint definitions before they reach the store.

use anyhow::{Result, anyhow};
use url::Url;

use crate::database::models::EndpointRequest;
use crate::monitoring::types::HttpMethod;

/// Validate a create/update request and return its parsed method
pub fn validate_endpoint_request(request: &EndpointRequest) -> Result<HttpMethod> {
    if request.name.trim().is_empty() {
        return Err(anyhow!("Name is required"));
    }

    validate_http_target(&request.url)?;
    let method = validate_http_method(&request.method)?;

    if request.expected_status == 0 {
        return Err(anyhow!("Expected status must be positive"));
    }

    validate_timeout(request.timeout_ms)?;
    validate_check_interval(request.check_interval_ms)?;

    if request.timeout_ms > request.check_interval_ms {
        tracing::warn!(
            "Endpoint '{}' has a timeout ({}ms) longer than its check interval ({}ms); \
             hung probes may overlap the next tick",
            request.name,
            request.timeout_ms,
            request.check_interval_ms
        );
    }

    Ok(method)
}

/// Validate HTTP/HTTPS target
pub fn validate_http_target(target: &str) -> Result<()> {
    if target.trim().is_empty() {
        return Err(anyhow!("URL is required"));
    }

    let url = Url::parse(target).map_err(|e| {
        if target.contains("://") {
            anyhow!("Invalid URL: {}", e)
        } else {
            anyhow!("URL must include scheme (http:// or https://)")
        }
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(anyhow!("Invalid scheme '{}'. Must be http or https", other)),
    }

    if url.host_str().is_none() {
        return Err(anyhow!("URL must have a valid host"));
    }

    if url.port() == Some(0) {
        return Err(anyhow!("Port 0 is not valid"));
    }

    Ok(())
}

/// Validate HTTP method
pub fn validate_http_method(method: &str) -> Result<HttpMethod> {
    if method.trim().is_empty() {
        return Err(anyhow!("HTTP method is required"));
    }
    method.parse::<HttpMethod>().map_err(|e| anyhow!(e))
}

/// Validate check interval
pub fn validate_check_interval(interval_ms: u64) -> Result<()> {
    const MAX_INTERVAL_MS: u64 = 24 * 3600 * 1000;

    if interval_ms == 0 {
        return Err(anyhow!("Check interval must be positive"));
    }

    if interval_ms > MAX_INTERVAL_MS {
        return Err(anyhow!(
            "Check interval too long: {} ms (maximum: {} ms)",
            interval_ms,
            MAX_INTERVAL_MS
        ));
    }

    Ok(())
}

/// Validate timeout is reasonable
pub fn validate_timeout(timeout_ms: u64) -> Result<()> {
    const MAX_TIMEOUT_MS: u64 = 300_000; // 5 minutes

    if timeout_ms == 0 {
        return Err(anyhow!("Timeout must be positive"));
    }

    if timeout_ms > MAX_TIMEOUT_MS {
        return Err(anyhow!("Timeout too long: {} ms (maximum: {} ms)", timeout_ms, MAX_TIMEOUT_MS));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_http_target() {
        assert!(validate_http_target("https://example.com").is_ok());
        assert!(validate_http_target("http://localhost:8080/health").is_ok());
        assert!(validate_http_target("http://127.0.0.1:3000").is_ok());

        assert!(validate_http_target("").is_err());
        assert!(validate_http_target("example.com").is_err());
        assert!(validate_http_target("ftp://example.com").is_err());
        assert!(validate_http_target("http://example.com:0").is_err());
    }

    #[test]
    fn test_validate_request_defaults() {
        let request = EndpointRequest::new("Posts", "https://jsonplaceholder.typicode.com/posts");
        assert_eq!(validate_endpoint_request(&request).unwrap(), HttpMethod::Get);
    }

    #[test]
    fn test_validate_request_rejects_bad_fields() {
        let base = EndpointRequest::new("Posts", "https://example.com");

        let mut request = base.clone();
        request.name = "   ".into();
        assert!(validate_endpoint_request(&request).is_err());

        let mut request = base.clone();
        request.method = "FETCH".into();
        assert!(validate_endpoint_request(&request).is_err());

        let mut request = base.clone();
        request.timeout_ms = 0;
        assert!(validate_endpoint_request(&request).is_err());

        let mut request = base.clone();
        request.check_interval_ms = 0;
        assert!(validate_endpoint_request(&request).is_err());

        let mut request = base;
        request.expected_status = 0;
        assert!(validate_endpoint_request(&request).is_err());
    }

    #[test]
    fn test_timeout_longer_than_interval_is_allowed() {
        let mut request = EndpointRequest::new("Slow", "https://example.com");
        request.timeout_ms = 60_000;
        request.check_interval_ms = 30_000;
        assert!(validate_endpoint_request(&request).is_ok());
    }
}
