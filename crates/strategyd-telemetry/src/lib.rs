//! Structured logging and Prometheus metrics, carried as ambient
//! infrastructure regardless of spec.md's Non-goals (§1 of SPEC_FULL.md).

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
