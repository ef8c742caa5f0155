//! Telemetry module for logging and metrics.
//!
//! Provides:
//! - Logging configuration and initialization
//! - Relay counters

mod logging;
mod metrics;

pub use logging::{init_logging, parse_level, LogConfig, LogFormat};
pub use metrics::{Counter, RelayStats};
