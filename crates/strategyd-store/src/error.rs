//! Strategy Store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("strategy not found: {0}")]
    NotFound(String),

    #[error("trading wallet not found: {0}")]
    WalletNotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("config serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
