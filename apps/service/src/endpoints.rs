//! Endpoint management: validated CRUD over the endpoint store.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::database::Database;
use crate::database::models::{Endpoint, EndpointRequest};
use crate::error::{MonitorError, MonitorResult};
use crate::monitoring::validation::validate_endpoint_request;

pub struct EndpointService {
    database: Arc<dyn Database>,
}

impl EndpointService {
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self { database }
    }

    pub async fn list(&self) -> MonitorResult<Vec<Endpoint>> {
        Ok(self.database.list_endpoints().await?)
    }

    pub async fn list_active(&self) -> MonitorResult<Vec<Endpoint>> {
        Ok(self.database.list_active_endpoints().await?)
    }

    pub async fn get(&self, id: i64) -> MonitorResult<Endpoint> {
        self.database.get_endpoint(id).await?.ok_or(MonitorError::EndpointNotFound(id))
    }

    pub async fn count_active(&self) -> MonitorResult<u64> {
        Ok(self.database.count_active_endpoints().await?)
    }

    pub async fn create(&self, request: EndpointRequest) -> MonitorResult<Endpoint> {
        let method = validate_endpoint_request(&request).map_err(|e| MonitorError::Validation(e.to_string()))?;

        let mut endpoint = Endpoint::new(request.name, request.url, method);
        endpoint.expected_status = request.expected_status;
        endpoint.timeout_ms = request.timeout_ms;
        endpoint.check_interval_ms = request.check_interval_ms;
        endpoint.active = request.active;

        endpoint.id = Some(self.database.insert_endpoint(&endpoint).await?);
        info!("Created endpoint {} ({} {})", endpoint.name, endpoint.method, endpoint.url);
        Ok(endpoint)
    }

    pub async fn update(&self, id: i64, request: EndpointRequest) -> MonitorResult<Endpoint> {
        let method = validate_endpoint_request(&request).map_err(|e| MonitorError::Validation(e.to_string()))?;
        let mut endpoint = self.get(id).await?;

        endpoint.name = request.name;
        endpoint.url = request.url;
        endpoint.method = method;
        endpoint.expected_status = request.expected_status;
        endpoint.timeout_ms = request.timeout_ms;
        endpoint.check_interval_ms = request.check_interval_ms;
        endpoint.active = request.active;
        endpoint.updated_at = Utc::now();

        self.save(endpoint).await
    }

    /// Flip the active flag. History is left untouched either way.
    pub async fn toggle(&self, id: i64) -> MonitorResult<Endpoint> {
        let mut endpoint = self.get(id).await?;
        endpoint.active = !endpoint.active;
        endpoint.updated_at = Utc::now();

        let endpoint = self.save(endpoint).await?;
        info!(
            "Endpoint {} is now {}",
            endpoint.name,
            if endpoint.active { "active" } else { "inactive" }
        );
        Ok(endpoint)
    }

    /// Delete an endpoint together with its probe history
    pub async fn delete(&self, id: i64) -> MonitorResult<()> {
        if !self.database.delete_endpoint(id).await? {
            return Err(MonitorError::EndpointNotFound(id));
        }
        info!("Deleted endpoint {}", id);
        Ok(())
    }

    async fn save(&self, endpoint: Endpoint) -> MonitorResult<Endpoint> {
        let id = endpoint.id_or_default();
        if !self.database.update_endpoint(&endpoint).await? {
            return Err(MonitorError::EndpointNotFound(id));
        }
        Ok(endpoint)
    }
}
