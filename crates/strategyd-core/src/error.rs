//! Error types for strategyd-core.

use thiserror::Error;

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid percentage: {0}")]
    InvalidPercentage(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("strategy kind does not match config variant")]
    KindConfigMismatch,

    #[error("decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
