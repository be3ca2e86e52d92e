//! Supervisor error types. Per §7, a reconcile-cycle error never escapes
//! the loop — it is logged, the poll wait is doubled once, and the next
//! cycle resumes normal cadence.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("strategy store error: {0}")]
    Store(#[from] strategyd_store::StoreError),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
