#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Result, anyhow};
use apiwatch_service::config::Config;
use apiwatch_service::database::{Database, DatabaseImpl, initialize_database};
use apiwatch_service::pool::open_pool;
use apiwatch_service::{Endpoint, EndpointRequest, Monitor};
use tempfile::{TempDir, tempdir};

/// Fresh migrated database in a temp dir. Keep the `TempDir` alive for the
/// duration of the test.
pub async fn create_test_database() -> Result<(Arc<dyn Database>, TempDir)> {
    let temp_dir = tempdir()?;
    let pool = open_pool(temp_dir.path().join("test.db"), 4).await?;

    {
        let conn = pool.get().await.map_err(|e| anyhow!("{e}"))?;
        initialize_database(&conn).await?;
    }

    Ok((Arc::new(DatabaseImpl::new_from_pool(pool)), temp_dir))
}

/// Config pointing at a database file inside `dir`
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.database.path = dir.path().join("monitor.db").display().to_string();
    config
}

/// Monitor using the real HTTP checker over a fresh database
pub async fn create_test_monitor(configure: impl FnOnce(&mut Config)) -> Result<(Monitor, TempDir)> {
    let temp_dir = tempdir()?;
    let mut config = test_config(&temp_dir);
    configure(&mut config);
    let monitor = Monitor::open(&config).await?;
    Ok((monitor, temp_dir))
}

pub async fn add_endpoint(monitor: &Monitor, name: &str, url: String) -> Result<Endpoint> {
    Ok(monitor.endpoints().create(EndpointRequest::new(name, url)).await?)
}
