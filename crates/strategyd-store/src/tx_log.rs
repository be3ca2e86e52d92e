//! [`TransactionLog`] implementations backed by this crate's two Store
//! backends. Kept here rather than in `strategyd-swap` since the trait's
//! only job is to append to the `transactions` table this crate owns.

use async_trait::async_trait;
use sqlx::PgPool;
use strategyd_swap::{TransactionLog, TransactionLogRow};

/// Appends a row to the Postgres `transactions` table on every swap.
pub struct PgTransactionLog {
    pool: PgPool,
}

impl PgTransactionLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionLog for PgTransactionLog {
    async fn record(&self, row: TransactionLogRow) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO transactions \
             (trading_wallet_id, signature, input_mint, output_mint, input_amount, output_amount, at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(row.trading_wallet_id.as_str())
        .bind(&row.signature)
        .bind(row.input_mint.as_str())
        .bind(row.output_mint.as_str())
        .bind(row.input_amount as i64)
        .bind(row.output_amount as i64)
        .bind(row.at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Discards every row. Paired with the in-memory Strategy Store for local
/// runs and smoke tests where there is no database to log into.
pub struct NoopTransactionLog;

#[async_trait]
impl TransactionLog for NoopTransactionLog {
    async fn record(&self, _row: TransactionLogRow) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use strategyd_core::{Mint, TradingWalletId};

    #[tokio::test]
    async fn noop_log_always_succeeds() {
        let log = NoopTransactionLog;
        let row = TransactionLogRow {
            trading_wallet_id: TradingWalletId::from("w1".to_string()),
            signature: "sig".into(),
            input_mint: Mint::from("mintA"),
            output_mint: Mint::from("mintB"),
            input_amount: 1_000,
            output_amount: 2_000,
            at: Utc::now(),
        };
        assert!(log.record(row).await.is_ok());
    }
}
