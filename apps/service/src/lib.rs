//! apiwatch: scheduled HTTP health checks with persisted history and
//! rolling health/latency statistics.

pub mod config;
pub mod database;
pub mod endpoints;
pub mod error;
pub mod monitoring;
pub mod orchestrator;
pub mod pool;

pub use config::Config;
pub use database::{Endpoint, EndpointRequest};
pub use error::{MonitorError, MonitorResult};
pub use monitoring::{HttpMethod, ProbeOutcome, ProbeResult, StatsSummary};
pub use orchestrator::{BackgroundTasks, Monitor};
