//! Operational concerns.
//!
//! - `telemetry` - Logging setup and runtime log-level control

pub mod telemetry;

pub use telemetry::{init_tracing, set_log_level, LogHandle};
