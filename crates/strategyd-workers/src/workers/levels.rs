//! Levels (ladder) worker (§4.7): a sequence of buy/sell price rungs, each
//! with its own cooldown and retrigger budget, evaluated against the
//! crossing of `last_price` rather than an absolute comparison.

use crate::context::WorkerDeps;
use crate::worker::{sleep_or_cancelled, Worker};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use solana_sdk::signature::Keypair;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use strategyd_core::{Level, LevelKind, LevelsConfig, StrategyId, StrategyKind, TradeLogEntry, TradingWalletId};
use strategyd_swap::{SwapContext, SwapRequest};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const T_CHECK: StdDuration = StdDuration::from_secs(60);
const MIN_TRADE_NATIVE: f64 = 0.01;

pub struct LevelsWorker {
    strategy_id: StrategyId,
    trading_wallet_id: TradingWalletId,
    wallet_pubkey: String,
    keypair: Arc<Keypair>,
    deps: WorkerDeps,
    config: Mutex<LevelsConfig>,
}

impl LevelsWorker {
    pub fn new(
        strategy_id: StrategyId,
        trading_wallet_id: TradingWalletId,
        wallet_pubkey: String,
        keypair: Arc<Keypair>,
        deps: WorkerDeps,
        config: LevelsConfig,
    ) -> Self {
        Self {
            strategy_id,
            trading_wallet_id,
            wallet_pubkey,
            keypair,
            deps,
            config: Mutex::new(config),
        }
    }

    fn crossed(level: &Level, last_price: Option<Decimal>, price: Decimal) -> bool {
        match level.kind {
            LevelKind::LimitBuy | LevelKind::StopLoss => match last_price {
                Some(last) => last > level.price && price <= level.price,
                None => price <= level.price,
            },
            LevelKind::TakeProfit => match last_price {
                Some(last) => last < level.price && price >= level.price,
                None => price >= level.price,
            },
        }
    }

    async fn min_trade_base_units(&self) -> u64 {
        match self.deps.catalog.token_info(&self.deps.native_mint).await {
            Ok(info) => (MIN_TRADE_NATIVE * 10f64.powi(info.decimals as i32)) as u64,
            Err(_) => 10_000_000,
        }
    }

    /// One check cycle. Returns `true` if the strategy completed (no level
    /// remains eligible and `auto_restart_after_complete` is false) and the
    /// worker should stop.
    async fn tick(&self) -> bool {
        let price_f64 = match self.deps.oracle.price(&self.deps.native_symbol).await {
            Ok(p) => p,
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "price fetch failed");
                return false;
            }
        };
        let price = Decimal::from_f64_retain(price_f64).unwrap_or_default();
        let now = Utc::now();

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

        let last_price = self.config.lock().last_price;
        let indices: Vec<usize> = {
            let config = self.config.lock();
            (0..config.levels.len())
                .filter(|&i| config.levels[i].is_eligible(now) && Self::crossed(&config.levels[i], last_price, price))
                .collect()
        };

        for i in indices {
            self.execute_level(i, now).await;
        }

        self.config.lock().last_price = Some(price);
        self.persist_config().await;

        let any_eligible = self.config.lock().levels.iter().any(|l| l.is_eligible(now));
        if any_eligible {
            return false;
        }

        let auto_restart = self.config.lock().auto_restart_after_complete;
        if auto_restart {
            self.reset_levels();
            self.persist_config().await;
            false
        } else {
            if let Err(e) = self.deps.store.update_active(&self.strategy_id, false).await {
                warn!(strategy_id = %self.strategy_id, error = %e, "failed to mark levels strategy inactive on completion");
            }
            info!(strategy_id = %self.strategy_id, "levels strategy completed, no auto-restart");
            true
        }
    }

    fn reset_levels(&self) {
        let mut config = self.config.lock();
        for level in config.levels.iter_mut() {
            level.executed = false;
            level.executed_count = 0;
            level.executed_at = None;
            level.cooldown_until = None;
            level.permanently_disabled = false;
        }
    }

    async fn persist_config(&self) {
        let config = self.config.lock().clone();
        if let Err(e) = self
            .deps
            .store
            .update_config(
                &self.strategy_id,
                strategyd_core::StrategyConfig::Levels(config),
            )
            .await
        {
            warn!(strategy_id = %self.strategy_id, error = %e, "failed to persist levels state");
        }
    }

    async fn execute_level(&self, index: usize, now: DateTime<Utc>) {
        let (cooldown_hours, max_retriggers, is_buy) = {
            let config = self.config.lock();
            let level = &config.levels[index];
            (config.cooldown_hours, config.max_retriggers, level.kind.is_buy())
        };

        let outcome = if is_buy {
            self.execute_buy(index).await
        } else {
            self.execute_sell(index).await
        };

        let mut config = self.config.lock();
        let level = &mut config.levels[index];
        match &outcome {
            Ok((signature, _in_amt, _out_amt)) => {
                level.record_execution(now, cooldown_hours, max_retriggers);
                level.push_history(now, true, Some(signature.clone()), None);
            }
            Err(message) => {
                level.push_history(now, false, None, Some(message.clone()));
            }
        }
    }

    async fn execute_buy(&self, index: usize) -> Result<(String, u64, u64), String> {
        let usdc_amount = {
            let config = self.config.lock();
            config.levels[index].usdc_amount.unwrap_or_default()
        };

        let quote_balance = self
            .deps
            .chain
            .token_balance(&self.wallet_pubkey, self.deps.quote_mint.as_str())
            .await
            .map_err(|e| e.to_string())?;

        let amount_base_units = decimal_to_u64(usdc_amount);
        if quote_balance < amount_base_units {
            return Err("insufficient USDC balance for limit buy".into());
        }

        self.run_swap(self.deps.quote_mint.clone(), self.deps.native_mint.clone(), amount_base_units, StrategyKind::Levels)
            .await
    }

    async fn execute_sell(&self, index: usize) -> Result<(String, u64, u64), String> {
        let sol_percentage = {
            let config = self.config.lock();
            config.levels[index].sol_percentage.unwrap_or_default()
        };

        let native_balance = self
            .deps
            .chain
            .native_balance(&self.wallet_pubkey)
            .await
            .map_err(|e| e.to_string())?;

        let min_trade = self.min_trade_base_units().await;
        if native_balance < min_trade {
            return Err("insufficient native balance for sell level".into());
        }

        let raw_amount = decimal_to_u64(Decimal::from(native_balance) * sol_percentage / Decimal::from(100));
        let cap = native_balance.saturating_sub(self.deps.fee_reserve_lamports);
        let amount = raw_amount.min(cap);

        if amount < min_trade {
            return Err("sell amount below minimum trade threshold after fee reserve clamp".into());
        }

        self.run_swap(self.deps.native_mint.clone(), self.deps.quote_mint.clone(), amount, StrategyKind::Levels)
            .await
    }

    async fn run_swap(
        &self,
        input_mint: strategyd_core::Mint,
        output_mint: strategyd_core::Mint,
        amount: u64,
        kind: StrategyKind,
    ) -> Result<(String, u64, u64), String> {
        let request = SwapRequest {
            input_mint,
            output_mint,
            amount,
            slippage_bps: 50,
            wallet_keypair: self.keypair.clone(),
            fee_account: None,
            platform_fee_bps: None,
        };
        let context = SwapContext {
            strategy_id: self.strategy_id.clone(),
            strategy_kind: kind,
            trading_wallet_id: Some(self.trading_wallet_id.clone()),
            wallet_pubkey: self.wallet_pubkey.clone(),
        };

        match self.deps.swap.execute(request, context).await {
            Ok(result) => {
                let _ = self
                    .deps
                    .store
                    .append_trade(
                        &self.strategy_id,
                        TradeLogEntry {
                            at: Utc::now(),
                            success: true,
                            signature: Some(result.signature.clone()),
                            error_message: None,
                            input_amount: Some(result.input_amount),
                            output_amount: Some(result.output_amount),
                        },
                    )
                    .await;
                Ok((result.signature, result.input_amount, result.output_amount))
            }
            Err(e) => {
                let message = e.to_string();
                let _ = self
                    .deps
                    .store
                    .append_trade(
                        &self.strategy_id,
                        TradeLogEntry {
                            at: Utc::now(),
                            success: false,
                            signature: None,
                            error_message: Some(message.clone()),
                            input_amount: None,
                            output_amount: None,
                        },
                    )
                    .await;
                Err(message)
            }
        }
    }
}

fn decimal_to_u64(d: Decimal) -> u64 {
    d.trunc().to_string().parse().unwrap_or(0)
}

#[async_trait]
impl Worker for LevelsWorker {
    fn strategy_id(&self) -> &StrategyId {
        &self.strategy_id
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Levels
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
