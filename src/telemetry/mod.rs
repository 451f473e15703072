//! Telemetry: logging setup and forwarding counters.

mod logging;
mod metrics;

pub use logging::{init_logging, LogConfig};
pub use metrics::{Counter, InterfaceStats, RouterStats};
