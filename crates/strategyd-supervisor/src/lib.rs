//! The Supervisor (C8): reconciles a desired set of active workers against
//! the persisted Strategy Store, managing lifecycle with at-most-one-
//! worker-per-strategy and no leaked worker after a configuration flip.

pub mod error;
pub mod supervisor;

pub use error::SupervisorError;
pub use supervisor::{ReconcileSummary, Supervisor, DEFAULT_POLL_INTERVAL};
