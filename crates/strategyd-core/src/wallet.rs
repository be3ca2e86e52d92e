//! Trading wallet metadata.
//!
//! The secret key itself is never held here — only a reference to the
//! encrypted blob the key-escrow service can decrypt on demand.

use crate::ids::TradingWalletId;
use serde::{Deserialize, Serialize};

/// A per-strategy sub-wallet. The private key is materialized only inside
/// the Worker that owns the strategy using it (see [`crate::StrategyId`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingWallet {
    pub id: TradingWalletId,
    pub public_key: String,
    /// Opaque reference to the encrypted secret-key blob; resolved through
    /// the Key Escrow interface, never stored or cached here.
    pub secret_key_ref: String,
}
