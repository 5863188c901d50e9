//! Monitoring engine module - probes endpoints and summarizes their health
//!
//! This module is responsible for:
//! - Executing bounded HTTP probes and classifying their outcome
//! - Scheduling probes on a global tick or per-endpoint timers
//! - Deriving health and latency statistics from probe history
pub mod checker;
pub mod executor;
pub mod scheduler;
pub mod stats;
pub mod types;
pub mod validation;

pub use executor::ProbeExecutor;
pub use scheduler::MonitoringScheduler;
pub use stats::{StatsAggregator, StatsSummary};
pub use types::{HttpMethod, ProbeFailure, ProbeOutcome, ProbeResult};
