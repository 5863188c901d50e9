//! Process-wide tracing setup shared by the apiwatch binaries.

mod tracing;

pub use self::tracing::{init_tracing, init_tracing_with_level};
