//! PairTrade worker (§4.8): holds either side of a two-token pair and flips
//! to the other side when an external detector's trigger row disagrees with
//! the currently-held side.

use crate::context::WorkerDeps;
use crate::worker::{sleep_or_cancelled, Worker};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use solana_sdk::signature::Keypair;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use strategyd_core::{
    Mint, PairSwapRecord, PairToken, PairTradeConfig, StrategyId, StrategyKind, TradeLogEntry,
    TradingWalletId,
};
use strategyd_swap::{SwapContext, SwapRequest};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const T_TRIGGER: StdDuration = StdDuration::from_secs(30);

pub struct PairTradeWorker {
    strategy_id: StrategyId,
    trading_wallet_id: TradingWalletId,
    wallet_pubkey: String,
    keypair: Arc<Keypair>,
    deps: WorkerDeps,
    config: Mutex<PairTradeConfig>,
    is_processing_swap: AtomicBool,
}

impl PairTradeWorker {
    pub fn new(
        strategy_id: StrategyId,
        trading_wallet_id: TradingWalletId,
        wallet_pubkey: String,
        keypair: Arc<Keypair>,
        deps: WorkerDeps,
        config: PairTradeConfig,
    ) -> Self {
        Self {
            strategy_id,
            trading_wallet_id,
            wallet_pubkey,
            keypair,
            deps,
            config: Mutex::new(config),
            is_processing_swap: AtomicBool::new(false),
        }
    }

    fn pair_key(&self) -> String {
        let config = self.config.lock();
        format!("{}/{}", config.token_a_symbol, config.token_b_symbol)
    }

    fn mint_for(&self, token: PairToken) -> Mint {
        let config = self.config.lock();
        match token {
            PairToken::A => config.token_a_mint.clone(),
            PairToken::B => config.token_b_mint.clone(),
        }
    }

    async fn persist_config(&self) {
        let config = self.config.lock().clone();
        if let Err(e) = self
            .deps
            .store
            .update_config(&self.strategy_id, strategyd_core::StrategyConfig::PairTrade(config))
            .await
        {
            warn!(strategy_id = %self.strategy_id, error = %e, "failed to persist pair trade state");
        }
    }

    /// Establishes the initial position if `swap_history` is still empty.
    /// Runs once, on the worker's very first tick.
    pub(crate) async fn ensure_initial_position(&self) {
        let has_history = !self.config.lock().swap_history.is_empty();
        if has_history {
            return;
        }
        if self.is_processing_swap.swap(true, Ordering::SeqCst) {
            return;
        }

        let pair_key = self.pair_key();
        let preferred = match self.deps.pair_signal.preferred_initial_token(&pair_key).await {
            Ok(t) => t,
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "failed to fetch preferred initial pair token");
                self.is_processing_swap.store(false, Ordering::SeqCst);
                return;
            }
        };

        self.establish_initial(preferred).await;
        self.is_processing_swap.store(false, Ordering::SeqCst);
    }

    /// Converts `allocation_percentage` of native balance into `token`,
    /// the one-time initial position swap described in §4.8.
    async fn establish_initial(&self, token: PairToken) {
        let allocation_percentage = self.config.lock().allocation_percentage;
        let to_mint = self.mint_for(token);

        let balance = match self.deps.chain.native_balance(&self.wallet_pubkey).await {
            Ok(b) => b,
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "balance read failed establishing initial pair position");
                return;
            }
        };
        let amount = (Decimal::from(balance) * allocation_percentage / Decimal::from(100))
            .trunc()
            .to_string()
            .parse::<u64>()
            .unwrap_or(0);
        if amount == 0 {
            return;
        }

        let request = SwapRequest {
            input_mint: self.deps.native_mint.clone(),
            output_mint: to_mint,
            amount,
            slippage_bps: 50,
            wallet_keypair: self.keypair.clone(),
            fee_account: None,
            platform_fee_bps: None,
        };
        let context = SwapContext {
            strategy_id: self.strategy_id.clone(),
            strategy_kind: StrategyKind::PairTrade,
            trading_wallet_id: Some(self.trading_wallet_id.clone()),
            wallet_pubkey: self.wallet_pubkey.clone(),
        };

        match self.deps.swap.execute(request, context).await {
            Ok(result) => {
                let now = Utc::now();
                {
                    let mut config = self.config.lock();
                    config.current_token = token;
                    config.last_swap_timestamp = Some(now);
                    config.swap_history.push(PairSwapRecord {
                        at: now,
                        from: token.other(),
                        to: token,
                        signature: result.signature.clone(),
                        amount_in: result.input_amount,
                        amount_out: result.output_amount,
                    });
                }
                self.persist_config().await;

                let _ = self
                    .deps
                    .store
                    .append_trade(
                        &self.strategy_id,
                        TradeLogEntry {
                            at: now,
                            success: true,
                            signature: Some(result.signature.clone()),
                            error_message: None,
                            input_amount: Some(result.input_amount),
                            output_amount: Some(result.output_amount),
                        },
                    )
                    .await;
                info!(strategy_id = %self.strategy_id, signature = %result.signature, "pair trade initial position established");
            }
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "initial pair position swap failed");
                let _ = self
                    .deps
                    .store
                    .append_trade(
                        &self.strategy_id,
                        TradeLogEntry {
                            at: Utc::now(),
                            success: false,
                            signature: None,
                            error_message: Some(e.to_string()),
                            input_amount: None,
                            output_amount: None,
                        },
                    )
                    .await;
            }
        }
    }

    /// One trigger-check cycle.
    pub(crate) async fn tick(&self) {
        let pair_key = self.pair_key();
        let trigger = match self.deps.pair_signal.trigger(&pair_key).await {
            Ok(t) => t,
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "pair trigger fetch failed");
                return;
            }
        };
        if !trigger.trigger_swap {
            return;
        }

        let held = self.config.lock().current_token;
        if trigger.current_direction == held {
            return;
        }

        if self.is_processing_swap.swap(true, Ordering::SeqCst) {
            // Single-flight: a concurrent flip is already in progress.
            return;
        }
        self.flip(held, held.other()).await;
        self.is_processing_swap.store(false, Ordering::SeqCst);
    }

    async fn flip(&self, from: PairToken, to: PairToken) {
        let allocation_percentage = self.config.lock().allocation_percentage;
        let from_mint = self.mint_for(from);
        let to_mint = self.mint_for(to);

        let balance = if from_mint == self.deps.native_mint {
            self.deps.chain.native_balance(&self.wallet_pubkey).await
        } else {
            self.deps
                .chain
                .token_balance(&self.wallet_pubkey, from_mint.as_str())
                .await
        };
        let balance = match balance {
            Ok(b) => b,
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "balance read failed during pair flip");
                return;
            }
        };

        let amount = (Decimal::from(balance) * allocation_percentage / Decimal::from(100))
            .trunc()
            .to_string()
            .parse::<u64>()
            .unwrap_or(0);
        if amount == 0 {
            return;
        }

        let slippage_bps = (self.config.lock().max_slippage * Decimal::from(100))
            .to_string()
            .parse::<f64>()
            .map(|bps| bps as u16)
            .unwrap_or(50);

        let request = SwapRequest {
            input_mint: from_mint,
            output_mint: to_mint,
            amount,
            slippage_bps,
            wallet_keypair: self.keypair.clone(),
            fee_account: None,
            platform_fee_bps: None,
        };
        let context = SwapContext {
            strategy_id: self.strategy_id.clone(),
            strategy_kind: StrategyKind::PairTrade,
            trading_wallet_id: Some(self.trading_wallet_id.clone()),
            wallet_pubkey: self.wallet_pubkey.clone(),
        };

        match self.deps.swap.execute(request, context).await {
            Ok(result) => {
                let now = Utc::now();
                {
                    let mut config = self.config.lock();
                    config.current_token = to;
                    config.last_swap_timestamp = Some(now);
                    config.swap_history.push(PairSwapRecord {
                        at: now,
                        from,
                        to,
                        signature: result.signature.clone(),
                        amount_in: result.input_amount,
                        amount_out: result.output_amount,
                    });
                }
                self.persist_config().await;

                let _ = self
                    .deps
                    .store
                    .append_trade(
                        &self.strategy_id,
                        TradeLogEntry {
                            at: now,
                            success: true,
                            signature: Some(result.signature.clone()),
                            error_message: None,
                            input_amount: Some(result.input_amount),
                            output_amount: Some(result.output_amount),
                        },
                    )
                    .await;
                info!(strategy_id = %self.strategy_id, signature = %result.signature, "pair trade flipped");
            }
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "pair trade flip failed");
                let _ = self
                    .deps
                    .store
                    .append_trade(
                        &self.strategy_id,
                        TradeLogEntry {
                            at: Utc::now(),
                            success: false,
                            signature: None,
                            error_message: Some(e.to_string()),
                            input_amount: None,
                            output_amount: None,
                        },
                    )
                    .await;
            }
        }
    }
}

#[async_trait]
impl Worker for PairTradeWorker {
    fn strategy_id(&self) -> &StrategyId {
        &self.strategy_id
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::PairTrade
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) {
        self.ensure_initial_position().await;
        loop {
            self.tick().await;
            if !sleep_or_cancelled(T_TRIGGER, &cancel).await {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixed_balance_rpc, fixed_oracle, memory_deps_full, test_keypair, FakePairSignal};
    use rust_decimal_macros::dec;
    use strategyd_core::{Strategy, StrategyConfig};
    use strategyd_store::{InMemoryStrategyStore, StrategyRecord};

    fn config() -> PairTradeConfig {
        PairTradeConfig {
            token_a_mint: "mint-a".into(),
            token_b_mint: "mint-b".into(),
            token_a_symbol: "TOKA".into(),
            token_b_symbol: "TOKB".into(),
            allocation_percentage: dec!(50),
            current_token: PairToken::A,
            max_slippage: dec!(1),
            swap_history: Vec::new(),
            last_swap_timestamp: None,
        }
    }

    fn setup(signal: Arc<FakePairSignal>) -> (PairTradeWorker, Arc<InMemoryStrategyStore>) {
        let cfg = config();
        let store = Arc::new(InMemoryStrategyStore::new());
        let strategy = Strategy::new(
            "s1".into(),
            "w1".into(),
            "owner".into(),
            StrategyConfig::PairTrade(cfg.clone()),
        )
        .unwrap();
        store.insert(StrategyRecord {
            strategy,
            trading_wallet_public_key: "pubkey".into(),
        });

        let oracle = fixed_oracle(vec![100.0]);
        let chain = fixed_balance_rpc(1_000_000_000, 1_000_000_000);
        let deps = memory_deps_full(
            store.clone(),
            chain,
            oracle,
            Arc::new(crate::test_support::AlwaysSucceedsSwapService),
            signal,
        );

        let worker = PairTradeWorker::new("s1".into(), "w1".into(), "pubkey".into(), test_keypair(), deps, cfg);
        (worker, store)
    }

    #[tokio::test]
    async fn first_start_establishes_initial_position() {
        let signal = Arc::new(FakePairSignal::new(PairToken::B));
        let (worker, store) = setup(signal);

        worker.ensure_initial_position().await;

        let record = store.get(&"s1".to_string().into()).await.unwrap().unwrap();
        assert_eq!(record.strategy.profit_tracking.trades.len(), 1);
    }

    #[tokio::test]
    async fn matching_direction_does_not_flip() {
        let signal = Arc::new(FakePairSignal::new(PairToken::A));
        signal.set(true, PairToken::A);
        let (worker, store) = setup(signal);

        worker.tick().await;

        let record = store.get(&"s1".to_string().into()).await.unwrap().unwrap();
        assert_eq!(record.strategy.profit_tracking.trades.len(), 0);
    }

    #[tokio::test]
    async fn disagreeing_direction_flips_and_records_history() {
        let signal = Arc::new(FakePairSignal::new(PairToken::A));
        signal.set(true, PairToken::B);
        let (worker, store) = setup(signal);

        worker.tick().await;

        let record = store.get(&"s1".to_string().into()).await.unwrap().unwrap();
        assert_eq!(record.strategy.profit_tracking.trades.len(), 1);
        if let StrategyConfig::PairTrade(cfg) = &record.strategy.config {
            assert_eq!(cfg.current_token, PairToken::B);
            assert_eq!(cfg.swap_history.len(), 1);
        } else {
            panic!("expected pair trade config");
        }
    }
}
