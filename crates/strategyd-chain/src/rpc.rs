//! The [`ChainRpc`] trait: balance reads, account lookups, transaction
//! submission, and account-level log subscriptions (C4 and part of §6.5).

use crate::types::{AccountInfo, Confirmation, LogsCallback, LogsSubscriptionId, ObservedSwap};
use async_trait::async_trait;

pub type Result<T> = crate::error::Result<T>;

#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Native (lamport-equivalent) balance in base units.
    async fn native_balance(&self, pubkey: &str) -> Result<u64>;

    /// SPL token balance in base units for `owner`'s account of `mint`.
    /// Returns 0 if the associated token account does not exist.
    async fn token_balance(&self, owner: &str, mint: &str) -> Result<u64>;

    async fn parsed_account_info(&self, address: &str) -> Result<Option<AccountInfo>>;

    async fn latest_blockhash(&self) -> Result<String>;

    /// Submits a base64-encoded, already-signed transaction. Returns its
    /// signature.
    async fn submit_transaction(&self, tx_base64: &str) -> Result<String>;

    async fn confirm_transaction(&self, signature: &str) -> Result<Confirmation>;

    /// Subscribes to logs mentioning `address`. The callback runs on an
    /// internal task for the lifetime of the subscription.
    async fn on_logs(&self, address: &str, callback: LogsCallback) -> Result<LogsSubscriptionId>;

    async fn remove_on_logs(&self, id: LogsSubscriptionId) -> Result<()>;

    /// Fetches `signature`'s confirmed transaction and returns the largest
    /// token-balance decrease `owner` experienced in it, if any — the
    /// token-balance-delta parse WalletMonitor (§4.5) needs to size a
    /// mirror trade. `None` if the transaction touched no balance for
    /// `owner`, e.g. it wasn't a swap.
    async fn observed_swap(&self, signature: &str, owner: &str) -> Result<Option<ObservedSwap>>;
}

/// Convenience wrapper pairing native and token balance reads (C4, Balance
/// Reader). Workers depend on this rather than the full `ChainRpc` surface
/// when they only need balances.
pub struct BalanceReader<R: ChainRpc> {
    rpc: std::sync::Arc<R>,
}

impl<R: ChainRpc> BalanceReader<R> {
    pub fn new(rpc: std::sync::Arc<R>) -> Self {
        Self { rpc }
    }

    pub async fn native(&self, pubkey: &str) -> Result<u64> {
        self.rpc.native_balance(pubkey).await
    }

    pub async fn token(&self, owner: &str, mint: &str) -> Result<u64> {
        self.rpc.token_balance(owner, mint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// A fixed-balance fake used by worker-level tests elsewhere in the
    /// workspace; kept here so downstream crates only need to depend on
    /// `strategyd-chain`'s public API, not a mocking framework.
    pub struct FixedBalanceRpc {
        pub native: AtomicU64,
        pub token: AtomicU64,
    }

    #[async_trait]
    impl ChainRpc for FixedBalanceRpc {
        async fn native_balance(&self, _pubkey: &str) -> Result<u64> {
            Ok(self.native.load(Ordering::SeqCst))
        }

        async fn token_balance(&self, _owner: &str, _mint: &str) -> Result<u64> {
            Ok(self.token.load(Ordering::SeqCst))
        }

        async fn parsed_account_info(&self, _address: &str) -> Result<Option<AccountInfo>> {
            Ok(None)
        }

        async fn latest_blockhash(&self) -> Result<String> {
            Ok("11111111111111111111111111111111".to_string())
        }

        async fn submit_transaction(&self, _tx_base64: &str) -> Result<String> {
            Ok("fake-signature".to_string())
        }

        async fn confirm_transaction(&self, _signature: &str) -> Result<Confirmation> {
            Ok(Confirmation {
                confirmed: true,
                slot: Some(1),
                err: None,
            })
        }

        async fn on_logs(&self, _address: &str, _callback: LogsCallback) -> Result<LogsSubscriptionId> {
            Ok(LogsSubscriptionId(1))
        }

        async fn remove_on_logs(&self, _id: LogsSubscriptionId) -> Result<()> {
            Err(ChainError::UnknownSubscription)
        }

        async fn observed_swap(&self, _signature: &str, _owner: &str) -> Result<Option<ObservedSwap>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn balance_reader_delegates_to_rpc() {
        let rpc = std::sync::Arc::new(FixedBalanceRpc {
            native: AtomicU64::new(5_000_000_000),
            token: AtomicU64::new(42),
        });
        let reader = BalanceReader::new(rpc);

        assert_eq!(reader.native("owner").await.unwrap(), 5_000_000_000);
        assert_eq!(reader.token("owner", "mint").await.unwrap(), 42);
    }
}
