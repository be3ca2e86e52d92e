//! WalletMonitor (mirror) worker (§4.5): watches another wallet's
//! transactions and proportionally mirrors any swap it performs.

use crate::context::WorkerDeps;
use crate::worker::Worker;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use solana_sdk::signature::Keypair;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use strategyd_core::{StrategyId, StrategyKind, TradeLogEntry, TradingWalletId, WalletMonitorConfig};
use strategyd_swap::{SwapContext, SwapRequest};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const MAX_RECENT: usize = 50;
const MAX_AGE: Duration = Duration::hours(1);

struct MirrorState {
    recent: VecDeque<(String, DateTime<Utc>)>,
    processing: HashSet<String>,
    last_processed: Option<String>,
}

impl MirrorState {
    fn new() -> Self {
        Self {
            recent: VecDeque::new(),
            processing: HashSet::new(),
            last_processed: None,
        }
    }

    /// Returns `true` if `signature` is a duplicate that must be dropped
    /// without another mirror attempt, per the idempotence invariant in §8.
    fn accept(&mut self, signature: &str, now: DateTime<Utc>) -> bool {
        if self.recent.iter().any(|(s, _)| s == signature)
            || self.processing.contains(signature)
            || self.last_processed.as_deref() == Some(signature)
        {
            return false;
        }
        self.recent.push_back((signature.to_string(), now));
        self.processing.insert(signature.to_string());
        self.last_processed = Some(signature.to_string());
        self.evict(now);
        true
    }

    fn evict(&mut self, now: DateTime<Utc>) {
        self.recent.retain(|(_, at)| now - *at < MAX_AGE);
        while self.recent.len() > MAX_RECENT {
            self.recent.pop_front();
        }
    }

    fn finish(&mut self, signature: &str) {
        self.processing.remove(signature);
    }
}

pub struct WalletMonitorWorker {
    strategy_id: StrategyId,
    trading_wallet_id: TradingWalletId,
    wallet_pubkey: String,
    keypair: Arc<Keypair>,
    deps: WorkerDeps,
    config: WalletMonitorConfig,
    state: Mutex<MirrorState>,
}

impl WalletMonitorWorker {
    pub fn new(
        strategy_id: StrategyId,
        trading_wallet_id: TradingWalletId,
        wallet_pubkey: String,
        keypair: Arc<Keypair>,
        deps: WorkerDeps,
        config: WalletMonitorConfig,
    ) -> Self {
        Self {
            strategy_id,
            trading_wallet_id,
            wallet_pubkey,
            keypair,
            deps,
            config,
            state: Mutex::new(MirrorState::new()),
        }
    }

    /// Processes one observed signature end to end: dedup, fetch, mirror.
    /// Exposed at crate visibility so tests can drive it directly without
    /// a live log subscription.
    pub(crate) async fn process_signature(&self, signature: String) {
        let now = Utc::now();
        if !self.state.lock().accept(&signature, now) {
            debug!(strategy_id = %self.strategy_id, signature, "duplicate signature, skipping");
            return;
        }

        if let Err(e) = self.mirror(&signature).await {
            warn!(strategy_id = %self.strategy_id, signature, error = %e, "mirror attempt failed");
        }

        self.state.lock().finish(&signature);
    }

    async fn mirror(&self, signature: &str) -> anyhow::Result<()> {
        let observed = self
            .deps
            .chain
            .observed_swap(signature, &self.config.watched_wallet)
            .await?;
        let Some(observed) = observed else {
            return Ok(());
        };
        if observed.pre_balance == 0 {
            return Ok(());
        }

        let our_balance = self.deps.chain.native_balance(&self.wallet_pubkey).await?;
        let allocated = Decimal::from(our_balance) * self.config.percentage / Decimal::from(100);
        let ratio = Decimal::from(observed.amount_sold) / Decimal::from(observed.pre_balance);
        let mirror_amount = (allocated * ratio).trunc();
        let mirror_amount: u64 = mirror_amount.to_string().parse().unwrap_or(0);

        if mirror_amount == 0 {
            return Ok(());
        }

        let request = SwapRequest {
            input_mint: self.deps.native_mint.clone(),
            output_mint: self.deps.quote_mint.clone(),
            amount: mirror_amount,
            slippage_bps: 50,
            wallet_keypair: self.keypair.clone(),
            fee_account: None,
            platform_fee_bps: None,
        };
        let context = SwapContext {
            strategy_id: self.strategy_id.clone(),
            strategy_kind: StrategyKind::WalletMonitor,
            trading_wallet_id: Some(self.trading_wallet_id.clone()),
            wallet_pubkey: self.wallet_pubkey.clone(),
        };

        match self.deps.swap.execute(request, context).await {
            Ok(result) => {
                info!(strategy_id = %self.strategy_id, signature, mirrored_signature = %result.signature, "mirrored watched wallet's swap");
                let _ = self
                    .deps
                    .store
                    .append_trade(
                        &self.strategy_id,
                        TradeLogEntry {
                            at: Utc::now(),
                            success: true,
                            signature: Some(result.signature),
                            error_message: None,
                            input_amount: Some(result.input_amount),
                            output_amount: Some(result.output_amount),
                        },
                    )
                    .await;
            }
            Err(e) => {
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
                return Err(e.into());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Worker for WalletMonitorWorker {
    fn strategy_id(&self) -> &StrategyId {
        &self.strategy_id
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::WalletMonitor
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let subscription = self
            .deps
            .chain
            .on_logs(
                &self.config.watched_wallet,
                Arc::new(move |event| {
                    let _ = tx.send(event.signature);
                }),
            )
            .await;

        let subscription_id = match subscription {
            Ok(id) => id,
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "failed to subscribe to watched wallet logs");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = rx.recv() => {
                    match next {
                        Some(signature) => self.process_signature(signature).await,
                        None => break,
                    }
                }
            }
        }

        if let Err(e) = self.deps.chain.remove_on_logs(subscription_id).await {
            warn!(strategy_id = %self.strategy_id, error = %e, "failed to remove log subscription on stop");
        }
    }
}
