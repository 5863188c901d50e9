//! Database abstraction layer
//!
//! Endpoint configuration and probe history live in a local libsql
//! (SQLite) database behind the `Database` trait.

pub mod migrations;
pub mod models;
pub mod repository;

pub use models::{Endpoint, EndpointRequest};
pub use repository::{Database, DatabaseImpl};

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
