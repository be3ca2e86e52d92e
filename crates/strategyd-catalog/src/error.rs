//! Token catalog error types.

use strategyd_core::Mint;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown token: {0}")]
    UnknownToken(Mint),

    #[error("pair is not eligible for trading: {0}")]
    IneligiblePair(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
