//! Ephemeral cross-strategy trade notifications.

use crate::ids::StrategyId;
use crate::strategy::StrategyKind;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Published by a worker on swap confirmation; delivered synchronously to
/// all live listeners on the same trading wallet, then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSuccessEvent {
    pub strategy_id: StrategyId,
    pub trading_wallet_pubkey: String,
    pub strategy_kind: StrategyKind,
    pub signature: String,
    pub timestamp: DateTime<Utc>,
    pub amount: Option<u64>,
    pub profit: Option<Decimal>,
}
