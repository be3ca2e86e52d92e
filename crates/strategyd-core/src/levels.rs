//! Price-ladder levels used by the Levels (ladder) strategy.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    LimitBuy,
    StopLoss,
    TakeProfit,
}

impl LevelKind {
    /// Buy-side levels convert USDC into the native token; sell-side levels
    /// convert the native token into USDC.
    pub fn is_buy(self) -> bool {
        matches!(self, Self::LimitBuy)
    }
}

/// Outcome of one execution attempt, kept for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelExecution {
    pub at: DateTime<Utc>,
    pub success: bool,
    pub signature: Option<String>,
    pub error_message: Option<String>,
}

/// A single rung of a Levels strategy's ladder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LevelKind,
    pub price: Decimal,
    pub usdc_amount: Option<Decimal>,
    pub sol_percentage: Option<Decimal>,
    #[serde(default)]
    pub executed: bool,
    #[serde(default)]
    pub executed_count: u32,
    pub executed_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub permanently_disabled: bool,
    #[serde(default)]
    pub execution_history: Vec<LevelExecution>,
}

impl Level {
    /// Validates the invariants spec'd for a Level. `None` means the level
    /// should be silently dropped at construction (price <= 0, or a
    /// sell-type level with `sol_percentage` outside `(0, 100]`, or a
    /// buy-type level missing `usdc_amount`).
    pub fn validated(self, max_retriggers: u32) -> Option<Self> {
        if self.price <= Decimal::ZERO {
            return None;
        }
        if self.kind.is_buy() {
            if self.usdc_amount.is_none() || self.usdc_amount <= Some(Decimal::ZERO) {
                return None;
            }
        } else {
            let pct = self.sol_percentage?;
            if pct <= Decimal::ZERO || pct > Decimal::from(100) {
                return None;
            }
        }
        if self.executed_count > max_retriggers {
            return None;
        }
        if self.permanently_disabled && self.executed_count < max_retriggers {
            // A disabled level must have exhausted its retriggers; otherwise
            // the row is inconsistent and is dropped rather than trusted.
            return None;
        }
        Some(self)
    }

    /// Eligible iff not permanently disabled and either never executed or
    /// past its cooldown.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        if self.permanently_disabled {
            return false;
        }
        if !self.executed {
            return true;
        }
        match self.cooldown_until {
            Some(until) => now >= until,
            None => true,
        }
    }

    pub fn record_execution(&mut self, now: DateTime<Utc>, cooldown_hours: i64, max_retriggers: u32) {
        self.executed = true;
        self.executed_count += 1;
        self.executed_at = Some(now);
        self.cooldown_until = Some(now + chrono::Duration::hours(cooldown_hours));
        if self.executed_count >= max_retriggers {
            self.permanently_disabled = true;
        }
    }

    pub fn push_history(&mut self, now: DateTime<Utc>, success: bool, signature: Option<String>, error_message: Option<String>) {
        self.execution_history.push(LevelExecution {
            at: now,
            success,
            signature,
            error_message,
        });
    }
}
