//! Perpetual futures position state, owned by the PerpPosition strategy.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

/// An open (or just-closed) position on the perp venue. An open position
/// always has `base_qty > 0`; the strategy row's `is_position_open` column
/// mirrors whether `current_position` is `Some`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerpPosition {
    pub market_index: u32,
    pub direction: Direction,
    pub base_qty: Decimal,
    pub quote_qty: Decimal,
    pub entry_price: Decimal,
    pub leverage: u8,
    pub liquidation_price: Decimal,
    pub margin_ratio: Decimal,
    pub unrealized_pnl: Decimal,
    pub current_price: Decimal,
}

impl PerpPosition {
    pub fn is_open(&self) -> bool {
        self.base_qty > Decimal::ZERO
    }
}
