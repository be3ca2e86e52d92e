//! Best-effort transaction logging: a row is appended to the `transactions`
//! log when the trading wallet is known to the Store, but a logging
//! failure never fails the swap itself (§4.2 Side effects).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use strategyd_core::{Mint, TradingWalletId};

pub struct TransactionLogRow {
    pub trading_wallet_id: TradingWalletId,
    pub signature: String,
    pub input_mint: Mint,
    pub output_mint: Mint,
    pub input_amount: u64,
    pub output_amount: u64,
    pub at: DateTime<Utc>,
}

#[async_trait]
pub trait TransactionLog: Send + Sync {
    async fn record(&self, row: TransactionLogRow) -> anyhow::Result<()>;
}
