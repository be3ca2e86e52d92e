//! Vault (profit capture) worker (§4.6): has no polling cadence of its own.
//! It subscribes to the Trade-Event Bus and skims a percentage of native
//! balance into the main wallet whenever a sibling strategy on the same
//! trading wallet completes a trade.

use crate::context::WorkerDeps;
use crate::worker::Worker;
use async_trait::async_trait;
use base64::Engine;
use rust_decimal::Decimal;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use std::str::FromStr;
use std::sync::Arc;
use strategyd_bus::SubscriptionId;
use strategyd_core::{StrategyId, StrategyKind, TradeLogEntry, TradingWalletId, VaultConfig};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 0.001 native units, expressed once the native mint's decimals are known.
const MIN_TRANSFER_NATIVE: f64 = 0.001;

pub struct VaultWorker {
    strategy_id: StrategyId,
    trading_wallet_id: TradingWalletId,
    wallet_pubkey: String,
    keypair: Arc<Keypair>,
    deps: WorkerDeps,
    config: VaultConfig,
}

impl VaultWorker {
    pub fn new(
        strategy_id: StrategyId,
        trading_wallet_id: TradingWalletId,
        wallet_pubkey: String,
        keypair: Arc<Keypair>,
        deps: WorkerDeps,
        config: VaultConfig,
    ) -> Self {
        Self {
            strategy_id,
            trading_wallet_id,
            wallet_pubkey,
            keypair,
            deps,
            config,
        }
    }

    async fn min_transfer_base_units(&self) -> u64 {
        match self.deps.catalog.token_info(&self.deps.native_mint).await {
            Ok(info) => (MIN_TRANSFER_NATIVE * 10f64.powi(info.decimals as i32)) as u64,
            Err(_) => 1_000_000,
        }
    }

    /// Runs one capture attempt in response to an accepted trade event.
    /// Exposed at crate visibility for direct testing without a live bus
    /// delivery.
    pub(crate) async fn capture(&self) {
        let balance = match self.deps.chain.native_balance(&self.wallet_pubkey).await {
            Ok(b) => b,
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "balance read failed during vault capture");
                return;
            }
        };

        let capture = (Decimal::from(balance) * self.config.vault_percentage / Decimal::from(100))
            .trunc()
            .to_string()
            .parse::<u64>()
            .unwrap_or(0);

        if capture < self.min_transfer_base_units().await {
            return;
        }

        if let Err(e) = self.transfer(capture).await {
            warn!(strategy_id = %self.strategy_id, error = %e, "vault transfer failed");
            let _ = self
                .deps
                .store
                .append_trade(
                    &self.strategy_id,
                    TradeLogEntry {
                        at: chrono::Utc::now(),
                        success: false,
                        signature: None,
                        error_message: Some(e.to_string()),
                        input_amount: Some(capture),
                        output_amount: None,
                    },
                )
                .await;
            return;
        }
    }

    async fn transfer(&self, lamports: u64) -> anyhow::Result<()> {
        let from = Pubkey::from_str(&self.wallet_pubkey)
            .map_err(|e| anyhow::anyhow!("invalid trading wallet pubkey: {e}"))?;
        let to = Pubkey::from_str(&self.config.main_wallet_pubkey)
            .map_err(|e| anyhow::anyhow!("invalid main wallet pubkey: {e}"))?;

        let blockhash_str = self.deps.chain.latest_blockhash().await?;
        let blockhash = blockhash_str
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid blockhash: {e}"))?;

        let instruction = system_instruction::transfer(&from, &to, lamports);
        let message = Message::new_with_blockhash(&[instruction], Some(&from), &blockhash);
        let tx = Transaction::new(&[self.keypair.as_ref()], message, blockhash);

        let bytes = bincode::serialize(&tx)?;
        let tx_base64 = base64::engine::general_purpose::STANDARD.encode(bytes);

        let signature = self.deps.chain.submit_transaction(&tx_base64).await?;
        let confirmation = self.deps.chain.confirm_transaction(&signature).await?;
        if !confirmation.confirmed {
            return Err(anyhow::anyhow!(
                "vault transfer not confirmed: {}",
                confirmation.err.unwrap_or_default()
            ));
        }

        self.deps.store.append_trade(
            &self.strategy_id,
            TradeLogEntry {
                at: chrono::Utc::now(),
                success: true,
                signature: Some(signature.clone()),
                error_message: None,
                input_amount: Some(lamports),
                output_amount: Some(lamports),
            },
        )
        .await?;

        info!(strategy_id = %self.strategy_id, signature, lamports, "vault capture transferred");
        Ok(())
    }
}

#[async_trait]
impl Worker for VaultWorker {
    fn strategy_id(&self) -> &StrategyId {
        &self.strategy_id
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Vault
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let wallet = self.wallet_pubkey.clone();
        let subscription: SubscriptionId = self.deps.bus.subscribe(move |event| {
            // Self-kind filter (§8 invariant 2): never react to a sibling
            // Vault strategy's own capture transfer.
            if event.trading_wallet_pubkey == wallet && event.strategy_kind != StrategyKind::Vault {
                let _ = tx.send(());
            }
        });

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = rx.recv() => {
                    match next {
                        Some(()) => self.capture().await,
                        None => break,
                    }
                }
            }
        }

        self.deps.bus.unsubscribe(subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixed_balance_rpc, fixed_oracle, memory_deps_for, test_keypair};
    use rust_decimal_macros::dec;
    use solana_sdk::signature::Signer;
    use strategyd_core::{Strategy, StrategyConfig};
    use strategyd_store::{InMemoryStrategyStore, StrategyRecord};

    fn worker() -> (VaultWorker, Arc<InMemoryStrategyStore>, Arc<Keypair>) {
        let keypair = test_keypair();
        let wallet_pubkey = keypair.pubkey().to_string();
        let config = VaultConfig::new(dec!(3), Keypair::new().pubkey().to_string()).unwrap();

        let store = Arc::new(InMemoryStrategyStore::new());
        let strategy = Strategy::new(
            "s1".into(),
            "w1".into(),
            "owner".into(),
            StrategyConfig::Vault(config.clone()),
        )
        .unwrap();
        store.insert(StrategyRecord {
            strategy,
            trading_wallet_public_key: wallet_pubkey.clone(),
        });

        let oracle = fixed_oracle(vec![100.0]);
        let chain = fixed_balance_rpc(1_000_000_000, 0);
        let deps = memory_deps_for(store.clone(), chain, oracle);

        let w = VaultWorker::new(
            "s1".into(),
            "w1".into(),
            wallet_pubkey,
            keypair.clone(),
            deps,
            config,
        );
        (w, store, keypair)
    }

    #[tokio::test]
    async fn capture_above_threshold_transfers_and_logs() {
        let (worker, store, _keypair) = worker();
        worker.capture().await;

        let record = store.get(&"s1".to_string().into()).await.unwrap().unwrap();
        assert_eq!(record.strategy.profit_tracking.trades.len(), 1);
        assert!(record.strategy.profit_tracking.trades[0].success);
    }

    #[tokio::test]
    async fn capture_below_threshold_is_skipped_silently() {
        let keypair = test_keypair();
        let wallet_pubkey = keypair.pubkey().to_string();
        let config = VaultConfig::new(dec!(3), Keypair::new().pubkey().to_string()).unwrap();

        let store = Arc::new(InMemoryStrategyStore::new());
        let strategy = Strategy::new(
            "s1".into(),
            "w1".into(),
            "owner".into(),
            StrategyConfig::Vault(config.clone()),
        )
        .unwrap();
        store.insert(StrategyRecord {
            strategy,
            trading_wallet_public_key: wallet_pubkey.clone(),
        });

        let oracle = fixed_oracle(vec![100.0]);
        // 3% of 10 lamports rounds to 0, well under the 0.001 SOL floor.
        let chain = fixed_balance_rpc(10, 0);
        let deps = memory_deps_for(store.clone(), chain, oracle);

        let worker = VaultWorker::new("s1".into(), "w1".into(), wallet_pubkey, keypair, deps, config);
        worker.capture().await;

        let record = store.get(&"s1".to_string().into()).await.unwrap().unwrap();
        assert_eq!(record.strategy.profit_tracking.trades.len(), 0);
    }
}
