//! Per-strategy performance and audit-trail bookkeeping.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One entry in a strategy's trade log. Written for every completed
/// *and* every failed swap attempt, so the audit trail is accurate even
/// when a worker never succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLogEntry {
    pub at: DateTime<Utc>,
    pub success: bool,
    pub signature: Option<String>,
    pub error_message: Option<String>,
    pub input_amount: Option<u64>,
    pub output_amount: Option<u64>,
}

/// Realized performance for a single calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPerformance {
    pub date: NaiveDate,
    pub realized: Decimal,
    pub trade_count: u32,
}

/// Running profit/loss bookkeeping for one strategy.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfitTracking {
    pub initial_balance: Decimal,
    pub current_balance: Decimal,
    pub realized_total: Decimal,
    #[serde(default)]
    pub trades: Vec<TradeLogEntry>,
    #[serde(default)]
    pub daily_performance: Vec<DailyPerformance>,
}

impl ProfitTracking {
    /// Appends `entry` to the trade log and, for a successful trade, folds
    /// its net token movement (`output_amount - input_amount`) into
    /// `realized_total` and the matching day's [`DailyPerformance`] bucket.
    /// Failed attempts are logged for the audit trail but contribute no
    /// realized movement.
    pub fn record_trade(&mut self, entry: TradeLogEntry) {
        if entry.success {
            let delta = Decimal::from(entry.output_amount.unwrap_or(0))
                - Decimal::from(entry.input_amount.unwrap_or(0));
            self.realized_total += delta;

            let date = entry.at.date_naive();
            match self.daily_performance.iter_mut().find(|d| d.date == date) {
                Some(day) => {
                    day.realized += delta;
                    day.trade_count += 1;
                }
                None => self.daily_performance.push(DailyPerformance {
                    date,
                    realized: delta,
                    trade_count: 1,
                }),
            }
        }
        self.trades.push(entry);
    }
}
