//! PriceMonitor worker (§4.4): a one-shot "sell when price crosses a
//! target" strategy. Fires once, auto-pauses the strategy, and stops
//! itself — repeated execution requires explicit external re-activation.

use crate::context::WorkerDeps;
use crate::worker::{sleep_or_cancelled, Worker};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use solana_sdk::signature::Keypair;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use strategyd_core::{PriceDirection, PriceMonitorConfig, StrategyId, StrategyKind, TradeLogEntry, TradingWalletId};
use strategyd_swap::{SwapContext, SwapRequest};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const T_CHECK: StdDuration = StdDuration::from_secs(60);
const T_COOLDOWN: Duration = Duration::seconds(300);

pub struct PriceMonitorWorker {
    strategy_id: StrategyId,
    trading_wallet_id: TradingWalletId,
    wallet_pubkey: String,
    keypair: Arc<Keypair>,
    deps: WorkerDeps,
    config: PriceMonitorConfig,
    last_triggered_at: Mutex<Option<DateTime<Utc>>>,
}

impl PriceMonitorWorker {
    pub fn new(
        strategy_id: StrategyId,
        trading_wallet_id: TradingWalletId,
        wallet_pubkey: String,
        keypair: Arc<Keypair>,
        deps: WorkerDeps,
        config: PriceMonitorConfig,
    ) -> Self {
        Self {
            strategy_id,
            trading_wallet_id,
            wallet_pubkey,
            keypair,
            deps,
            config,
            last_triggered_at: Mutex::new(None),
        }
    }

    fn crossed(&self, price: Decimal) -> bool {
        match self.config.direction {
            PriceDirection::Above => price >= self.config.target_price,
            PriceDirection::Below => price <= self.config.target_price,
        }
    }

    fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        match *self.last_triggered_at.lock() {
            Some(last) => now - last < T_COOLDOWN,
            None => false,
        }
    }

    /// One check cycle. Returns `true` if the worker fired and should stop.
    async fn tick(&self) -> bool {
        let price = match self.deps.oracle.price(&self.deps.native_symbol).await {
            Ok(p) => Decimal::from_f64_retain(p).unwrap_or_default(),
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "price fetch failed");
                return false;
            }
        };

        if !self.crossed(price) {
            return false;
        }

        let now = Utc::now();

        // Freshness check (§5): re-read is_active immediately before firing.
        let record = match self.deps.store.get(&self.strategy_id).await {
            Ok(Some(r)) => r,
            Ok(None) => return false,
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "store read failed");
                return false;
            }
        };
        if !record.strategy.is_active {
            return false;
        }

        if self.in_cooldown(now) {
            return false;
        }

        let balance = match self.deps.chain.native_balance(&self.wallet_pubkey).await {
            Ok(b) => b,
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "balance read failed");
                return false;
            }
        };

        let sell_amount = (Decimal::from(balance) * self.config.percentage_to_sell
            / Decimal::from(100))
        .trunc()
        .to_string()
        .parse::<u64>()
        .unwrap_or(0);

        if sell_amount == 0 {
            return false;
        }

        let request = SwapRequest {
            input_mint: self.deps.native_mint.clone(),
            output_mint: self.deps.quote_mint.clone(),
            amount: sell_amount,
            slippage_bps: 50,
            wallet_keypair: self.keypair.clone(),
            fee_account: None,
            platform_fee_bps: None,
        };
        let context = SwapContext {
            strategy_id: self.strategy_id.clone(),
            strategy_kind: StrategyKind::PriceMonitor,
            trading_wallet_id: Some(self.trading_wallet_id.clone()),
            wallet_pubkey: self.wallet_pubkey.clone(),
        };

        match self.deps.swap.execute(request, context).await {
            Ok(result) => {
                *self.last_triggered_at.lock() = Some(now);
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
                if let Err(e) = self.deps.store.update_active(&self.strategy_id, false).await {
                    warn!(strategy_id = %self.strategy_id, error = %e, "failed to auto-pause after fire");
                }
                info!(strategy_id = %self.strategy_id, signature = %result.signature, "price monitor fired, auto-paused");
                true
            }
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "swap failed");
                let _ = self
                    .deps
                    .store
                    .append_trade(
                        &self.strategy_id,
                        TradeLogEntry {
                            at: now,
                            success: false,
                            signature: None,
                            error_message: Some(e.to_string()),
                            input_amount: None,
                            output_amount: None,
                        },
                    )
                    .await;
                false
            }
        }
    }
}

#[async_trait]
impl Worker for PriceMonitorWorker {
    fn strategy_id(&self) -> &StrategyId {
        &self.strategy_id
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::PriceMonitor
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) {
        loop {
            if self.tick().await {
                return;
            }
            if !sleep_or_cancelled(T_CHECK, &cancel).await {
                return;
            }
        }
    }
}
