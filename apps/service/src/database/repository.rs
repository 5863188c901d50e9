use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Row, params};

use super::models::{Endpoint, from_millis, to_millis};
use crate::monitoring::types::{HttpMethod, ProbeOutcome, ProbeResult};
use crate::pool::{LibsqlManager, LibsqlPool};

const ENDPOINT_COLUMNS: &str = "id, name, url, http_method, expected_status, timeout_ms, check_interval_ms, is_active, created_at, updated_at";
const RESULT_COLUMNS: &str = "id, endpoint_id, status_code, response_time_ms, is_successful, error_message, checked_at, outcome";

/// Storage operations the monitoring engine and the endpoint service rely on
#[async_trait]
pub trait Database: Send + Sync {
    /// Get every endpoint, active or not, ordered by name
    async fn list_endpoints(&self) -> Result<Vec<Endpoint>>;

    /// Get all active endpoints, ordered by name
    async fn list_active_endpoints(&self) -> Result<Vec<Endpoint>>;

    /// Get an endpoint by id
    async fn get_endpoint(&self, id: i64) -> Result<Option<Endpoint>>;

    /// Insert a new endpoint and return its id
    async fn insert_endpoint(&self, endpoint: &Endpoint) -> Result<i64>;

    /// Update an existing endpoint. Returns false if no row matched.
    async fn update_endpoint(&self, endpoint: &Endpoint) -> Result<bool>;

    /// Delete an endpoint and its probe history. Returns false if no row matched.
    async fn delete_endpoint(&self, id: i64) -> Result<bool>;

    async fn count_active_endpoints(&self) -> Result<u64>;

    /// Persist a probe result and return its id
    async fn append_result(&self, result: &ProbeResult) -> Result<i64>;

    /// Full probe history of an endpoint, newest first
    async fn list_results(&self, endpoint_id: i64) -> Result<Vec<ProbeResult>>;

    /// Probe history at or after `since`, newest first
    async fn list_results_since(
        &self,
        endpoint_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<ProbeResult>>;

    /// Most recent probe result of an endpoint
    async fn latest_result(&self, endpoint_id: i64) -> Result<Option<ProbeResult>>;

    /// Delete every result checked strictly before `cutoff`; returns the number removed
    async fn delete_results_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// LibSQL database implementation
pub struct DatabaseImpl {
    pool: LibsqlPool,
}

impl DatabaseImpl {
    /// Create a new database instance from a pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        self.pool.get().await.map_err(|e| anyhow!("Failed to get database connection: {e}"))
    }

    async fn query_endpoints(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<Vec<Endpoint>> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query(sql, params).await?;
        let mut endpoints = Vec::new();

        while let Some(row) = rows.next().await? {
            endpoints.push(endpoint_from_row(&row)?);
        }

        Ok(endpoints)
    }

    async fn query_results(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<Vec<ProbeResult>> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query(sql, params).await?;
        let mut results = Vec::new();

        while let Some(row) = rows.next().await? {
            results.push(result_from_row(&row)?);
        }

        Ok(results)
    }
}

fn endpoint_from_row(row: &Row) -> Result<Endpoint> {
    let method: String = row.get(3)?;

    Ok(Endpoint {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        url: row.get(2)?,
        method: method.parse::<HttpMethod>().map_err(|e| anyhow!(e))?,
        expected_status: u16::try_from(row.get::<i64>(4)?).context("expected_status out of range")?,
        timeout_ms: row.get::<i64>(5)? as u64,
        check_interval_ms: row.get::<i64>(6)? as u64,
        active: row.get::<i64>(7)? != 0,
        created_at: from_millis(row.get(8)?),
        updated_at: from_millis(row.get(9)?),
    })
}

fn result_from_row(row: &Row) -> Result<ProbeResult> {
    let outcome: String = row.get(7)?;

    Ok(ProbeResult {
        id: Some(row.get(0)?),
        endpoint_id: row.get(1)?,
        status_code: row.get::<Option<i64>>(2)?.map(|v| v as u16),
        response_time_ms: row.get::<i64>(3)? as u64,
        success: row.get::<i64>(4)? != 0,
        error_message: row.get(5)?,
        checked_at: from_millis(row.get(6)?),
        outcome: outcome.parse::<ProbeOutcome>().map_err(|e| anyhow!(e))?,
    })
}

#[async_trait]
impl Database for DatabaseImpl {
    async fn list_endpoints(&self) -> Result<Vec<Endpoint>> {
        let sql = format!("SELECT {ENDPOINT_COLUMNS} FROM endpoints ORDER BY name, id");
        self.query_endpoints(&sql, ()).await
    }

    async fn list_active_endpoints(&self) -> Result<Vec<Endpoint>> {
        let sql = format!("SELECT {ENDPOINT_COLUMNS} FROM endpoints WHERE is_active = 1 ORDER BY name, id");
        self.query_endpoints(&sql, ()).await
    }

    async fn get_endpoint(&self, id: i64) -> Result<Option<Endpoint>> {
        let sql = format!("SELECT {ENDPOINT_COLUMNS} FROM endpoints WHERE id = ?");
        Ok(self.query_endpoints(&sql, params![id]).await?.into_iter().next())
    }

    async fn insert_endpoint(&self, endpoint: &Endpoint) -> Result<i64> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO endpoints (name, url, http_method, expected_status, timeout_ms, check_interval_ms, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                endpoint.name.clone(),
                endpoint.url.clone(),
                endpoint.method.to_string(),
                endpoint.expected_status as i64,
                endpoint.timeout_ms as i64,
                endpoint.check_interval_ms as i64,
                if endpoint.active { 1 } else { 0 },
                to_millis(endpoint.created_at),
                to_millis(endpoint.updated_at)
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn update_endpoint(&self, endpoint: &Endpoint) -> Result<bool> {
        let id = endpoint.id.ok_or_else(|| anyhow!("Cannot update an endpoint that was never saved"))?;
        let conn = self.get_conn().await?;

        let changed = conn
            .execute(
                "UPDATE endpoints SET name = ?, url = ?, http_method = ?, expected_status = ?, timeout_ms = ?, check_interval_ms = ?, is_active = ?, updated_at = ? WHERE id = ?",
                params![
                    endpoint.name.clone(),
                    endpoint.url.clone(),
                    endpoint.method.to_string(),
                    endpoint.expected_status as i64,
                    endpoint.timeout_ms as i64,
                    endpoint.check_interval_ms as i64,
                    if endpoint.active { 1 } else { 0 },
                    to_millis(endpoint.updated_at),
                    id
                ],
            )
            .await?;

        Ok(changed > 0)
    }

    async fn delete_endpoint(&self, id: i64) -> Result<bool> {
        let conn = self.get_conn().await?;

        // Explicit so history goes away even on connections without foreign_keys
        conn.execute("DELETE FROM probe_results WHERE endpoint_id = ?", params![id]).await?;
        let deleted = conn.execute("DELETE FROM endpoints WHERE id = ?", params![id]).await?;

        Ok(deleted > 0)
    }

    async fn count_active_endpoints(&self) -> Result<u64> {
        let conn = self.get_conn().await?;
        let mut rows = conn.query("SELECT COUNT(*) FROM endpoints WHERE is_active = 1", ()).await?;

        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as u64),
            None => Ok(0),
        }
    }

    async fn append_result(&self, result: &ProbeResult) -> Result<i64> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO probe_results (endpoint_id, status_code, response_time_ms, is_successful, error_message, checked_at, outcome) VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                result.endpoint_id,
                result.status_code.map(|v| v as i64),
                result.response_time_ms as i64,
                if result.success { 1 } else { 0 },
                result.error_message.clone(),
                to_millis(result.checked_at),
                result.outcome.to_string()
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn list_results(&self, endpoint_id: i64) -> Result<Vec<ProbeResult>> {
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM probe_results WHERE endpoint_id = ? ORDER BY checked_at DESC, id DESC"
        );
        self.query_results(&sql, params![endpoint_id]).await
    }

    async fn list_results_since(
        &self,
        endpoint_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<ProbeResult>> {
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM probe_results WHERE endpoint_id = ? AND checked_at >= ? ORDER BY checked_at DESC, id DESC"
        );
        self.query_results(&sql, params![endpoint_id, to_millis(since)]).await
    }

    async fn latest_result(&self, endpoint_id: i64) -> Result<Option<ProbeResult>> {
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM probe_results WHERE endpoint_id = ? ORDER BY checked_at DESC, id DESC LIMIT 1"
        );
        Ok(self.query_results(&sql, params![endpoint_id]).await?.into_iter().next())
    }

    async fn delete_results_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let conn = self.get_conn().await?;
        let deleted = conn
            .execute("DELETE FROM probe_results WHERE checked_at < ?", params![to_millis(cutoff)])
            .await?;
        Ok(deleted)
    }
}
