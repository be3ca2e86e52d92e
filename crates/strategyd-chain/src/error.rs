//! Chain RPC error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("RPC request failed: {0}")]
    Rpc(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid transaction payload: {0}")]
    InvalidTransaction(String),

    #[error("log subscription failed: {0}")]
    Subscription(String),

    #[error("unknown log subscription handle")]
    UnknownSubscription,
}

pub type Result<T> = std::result::Result<T, ChainError>;
