//! Worker-level error types.
//!
//! Per §7's propagation policy, almost none of these ever escape a running
//! worker's loop — they are logged and the loop continues to its next
//! tick. They only surface directly from construction, which aborts just
//! that worker's start (§7 "Configuration error").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("key escrow error: {0}")]
    KeyEscrow(String),

    #[error("store error: {0}")]
    Store(#[from] strategyd_store::StoreError),

    #[error("swap error: {0}")]
    Swap(#[from] strategyd_swap::SwapError),

    #[error("chain error: {0}")]
    Chain(#[from] strategyd_chain::ChainError),

    #[error("oracle error: {0}")]
    Oracle(#[from] strategyd_oracle::OracleError),

    #[error("catalog error: {0}")]
    Catalog(#[from] strategyd_catalog::CatalogError),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
