//! Swap driver error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("insufficient fee headroom: wallet holds less than amount + fee reserve")]
    InsufficientFeeHeadroom,

    #[error("swap quote failed: {0}")]
    Quote(String),

    #[error("swap build failed: {0}")]
    Build(String),

    #[error("failed to sign transaction: {0}")]
    Sign(String),

    #[error("chain error: {0}")]
    Chain(#[from] strategyd_chain::ChainError),

    #[error("swap failed after {attempts} attempt(s), final slippage {final_slippage_bps} bps: {cause}")]
    LadderExhausted {
        attempts: usize,
        final_slippage_bps: u16,
        cause: String,
    },

    #[error("swap failed: {0}")]
    Fatal(String),
}

pub type Result<T> = std::result::Result<T, SwapError>;
