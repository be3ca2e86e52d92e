//! Top-level application error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("telemetry error: {0}")]
    Telemetry(#[from] strategyd_telemetry::TelemetryError),

    #[error("oracle error: {0}")]
    Oracle(#[from] strategyd_oracle::OracleError),

    #[error("chain error: {0}")]
    Chain(#[from] strategyd_chain::ChainError),

    #[error("escrow error: {0}")]
    Escrow(#[from] strategyd_workers::EscrowError),

    #[error("perp venue error: {0}")]
    PerpVenue(#[from] strategyd_workers::PerpVenueError),

    #[error("swap error: {0}")]
    Swap(#[from] strategyd_swap::SwapError),

    #[error("store error: {0}")]
    Store(#[from] strategyd_store::StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
