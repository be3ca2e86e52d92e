//! Marketplace error types.

use strategyd_core::StrategyId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("strategy not found: {0}")]
    NotFound(StrategyId),

    #[error("strategy {0} is not owned by principal {1}")]
    NotOwner(StrategyId, String),

    #[error("strategy {0} is not currently published")]
    NotPublished(StrategyId),

    #[error("strategy store error: {0}")]
    Store(#[from] strategyd_store::StoreError),
}

pub type Result<T> = std::result::Result<T, MarketplaceError>;
