//! Swap request/result types (§3: SwapRequest / SwapResult).

use serde_json::Value;
use solana_sdk::signature::Keypair;
use std::sync::Arc;
use strategyd_core::Mint;

/// A quote for swapping `in_amount` of one token into another at a given
/// slippage tolerance. `route_plan` is opaque routing metadata from the
/// swap service, threaded back into `build_swap` unmodified.
#[derive(Debug, Clone)]
pub struct Quote {
    pub in_amount: u64,
    pub out_amount: u64,
    pub slippage_bps: u16,
    pub route_plan: Value,
}

/// One swap request. `amount` is always base units of the input token and
/// must be positive.
pub struct SwapRequest {
    pub input_mint: Mint,
    pub output_mint: Mint,
    pub amount: u64,
    pub slippage_bps: u16,
    pub wallet_keypair: Arc<Keypair>,
    pub fee_account: Option<String>,
    pub platform_fee_bps: Option<u16>,
}

/// Outcome of a confirmed swap. On success `signature` references a
/// confirmed chain transaction.
#[derive(Debug, Clone)]
pub struct SwapResult {
    pub signature: String,
    pub input_amount: u64,
    pub output_amount: u64,
    pub message: String,
}
