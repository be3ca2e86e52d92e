//! PerpPosition worker (§4.9): opens and closes a single leveraged position
//! on a perp venue based on configured entry/exit/stop/take-profit prices,
//! syncing local state against the venue's authoritative position on every
//! tick.

use crate::context::WorkerDeps;
use crate::perp_venue::OpenPositionRequest;
use crate::worker::{sleep_or_cancelled, Worker};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use solana_sdk::signature::Keypair;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use strategyd_core::{Direction, PerpPositionConfig, StrategyId, StrategyKind, TradeLogEntry, TradingWalletId};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const T_PERP: StdDuration = StdDuration::from_secs(5);
const COLLATERAL_BOOTSTRAP_FACTOR: Decimal = dec!(0.8);

pub struct PerpPositionWorker {
    strategy_id: StrategyId,
    trading_wallet_id: TradingWalletId,
    wallet_pubkey: String,
    keypair: Arc<Keypair>,
    deps: WorkerDeps,
    config: Mutex<PerpPositionConfig>,
    is_processing_order: AtomicBool,
}

impl PerpPositionWorker {
    pub fn new(
        strategy_id: StrategyId,
        trading_wallet_id: TradingWalletId,
        wallet_pubkey: String,
        keypair: Arc<Keypair>,
        deps: WorkerDeps,
        config: PerpPositionConfig,
    ) -> Self {
        Self {
            strategy_id,
            trading_wallet_id,
            wallet_pubkey,
            keypair,
            deps,
            config: Mutex::new(config),
            is_processing_order: AtomicBool::new(false),
        }
    }

    fn should_open(direction: Direction, price: Decimal, entry_price: Decimal) -> bool {
        match direction {
            Direction::Long => price <= entry_price,
            Direction::Short => price >= entry_price,
        }
    }

    fn should_close(
        direction: Direction,
        price: Decimal,
        exit_price: Decimal,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> bool {
        let exit_crossed = match direction {
            Direction::Long => price >= exit_price,
            Direction::Short => price <= exit_price,
        };
        let stopped = stop_loss.is_some_and(|sl| match direction {
            Direction::Long => price <= sl,
            Direction::Short => price >= sl,
        });
        let profited = take_profit.is_some_and(|tp| match direction {
            Direction::Long => price >= tp,
            Direction::Short => price <= tp,
        });
        exit_crossed || stopped || profited
    }

    /// Deposits the shortfall between the venue's total collateral and
    /// `native_balance × allocation_percentage × 0.8`, once, on first start.
    pub(crate) async fn bootstrap_collateral(&self) {
        let (market_index, allocation_percentage) = {
            let config = self.config.lock();
            (config.market_index, config.allocation_percentage)
        };

        let native_balance = match self.deps.chain.native_balance(&self.wallet_pubkey).await {
            Ok(b) => b,
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "balance read failed during perp collateral bootstrap");
                return;
            }
        };
        let target = Decimal::from(native_balance) * allocation_percentage / Decimal::from(100) * COLLATERAL_BOOTSTRAP_FACTOR;

        let total = match self.deps.perp_venue.total_collateral(&self.wallet_pubkey).await {
            Ok(t) => t,
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "total collateral read failed during perp bootstrap");
                return;
            }
        };
        if total >= target {
            return;
        }
        let shortfall = target - total;

        if let Err(e) = self
            .deps
            .perp_venue
            .deposit_collateral(&self.wallet_pubkey, shortfall, self.keypair.clone())
            .await
        {
            warn!(strategy_id = %self.strategy_id, market_index, error = %e, "collateral deposit failed");
        }
    }

    /// One sync-and-act cycle.
    pub(crate) async fn tick(&self) {
        let record = match self.deps.store.get(&self.strategy_id).await {
            Ok(Some(r)) => r,
            Ok(None) => return,
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "store read failed");
                return;
            }
        };
        if !record.strategy.is_active {
            return;
        }

        let market_index = self.config.lock().market_index;
        let price = match self.deps.perp_venue.mark_price(market_index).await {
            Ok(p) => p,
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "mark price fetch failed");
                return;
            }
        };

        let venue_position = match self.deps.perp_venue.position(market_index, &self.wallet_pubkey).await {
            Ok(p) => p,
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "position fetch failed");
                return;
            }
        };
        self.sync_position(venue_position).await;

        if self.is_processing_order.swap(true, Ordering::SeqCst) {
            return;
        }

        let (is_open, direction, entry_price, exit_price, stop_loss, take_profit) = {
            let config = self.config.lock();
            (
                config.is_position_open,
                config.direction,
                config.entry_price,
                config.exit_price,
                config.stop_loss,
                config.take_profit,
            )
        };

        if !is_open && Self::should_open(direction, price, entry_price) {
            self.open(price).await;
        } else if is_open && Self::should_close(direction, price, exit_price, stop_loss, take_profit) {
            self.close().await;
        }

        self.is_processing_order.store(false, Ordering::SeqCst);
    }

    /// Reconciles the venue's authoritative position against local state,
    /// persisting on any change.
    async fn sync_position(&self, venue_position: Option<strategyd_core::PerpPosition>) {
        let changed = {
            let mut config = self.config.lock();
            let is_open = venue_position.as_ref().is_some_and(|p| p.is_open());
            let changed = config.is_position_open != is_open
                || config.current_position.as_ref().map(|p| p.base_qty) != venue_position.as_ref().map(|p| p.base_qty);
            config.is_position_open = is_open;
            config.current_position = venue_position.clone();
            changed
        };
        if changed {
            if let Err(e) = self
                .deps
                .store
                .update_position(&self.strategy_id, venue_position.as_ref().is_some_and(|p| p.is_open()), venue_position)
                .await
            {
                warn!(strategy_id = %self.strategy_id, error = %e, "failed to persist perp position state");
            }
        }
    }

    async fn open(&self, price: Decimal) {
        let (market_index, direction, leverage, max_slippage) = {
            let config = self.config.lock();
            (config.market_index, config.direction, config.leverage, config.max_slippage)
        };

        let free_collateral = match self.deps.perp_venue.free_collateral(&self.wallet_pubkey).await {
            Ok(c) => c,
            Err(e) => {
                warn!(strategy_id = %self.strategy_id, error = %e, "free collateral read failed");
                return;
            }
        };
        if free_collateral <= Decimal::ZERO || price <= Decimal::ZERO {
            return;
        }
        let base_qty = free_collateral * Decimal::from(leverage) / price;

        let request = OpenPositionRequest {
            market_index,
            direction,
            base_qty,
            leverage,
            max_slippage,
            wallet_keypair: self.keypair.clone(),
        };

        match self.deps.perp_venue.open_position(request).await {
            Ok(position) => {
                {
                    let mut config = self.config.lock();
                    config.is_position_open = true;
                    config.current_position = Some(position.clone());
                }
                if let Err(e) = self
                    .deps
                    .store
                    .update_position(&self.strategy_id, true, Some(position))
                    .await
                {
                    warn!(strategy_id = %self.strategy_id, error = %e, "failed to persist opened perp position");
                }
                self.log_success("perp-open").await;
                info!(strategy_id = %self.strategy_id, market_index, "perp position opened");
            }
            Err(e) => {
                self.log_failure(&e.to_string()).await;
                warn!(strategy_id = %self.strategy_id, error = %e, "perp position open failed");
            }
        }
    }

    async fn close(&self) {
        let market_index = self.config.lock().market_index;

        match self
            .deps
            .perp_venue
            .close_position(market_index, &self.wallet_pubkey, self.keypair.clone())
            .await
        {
            Ok(_signature) => {
                {
                    let mut config = self.config.lock();
                    config.is_position_open = false;
                    config.current_position = None;
                }
                if let Err(e) = self.deps.store.update_position(&self.strategy_id, false, None).await {
                    warn!(strategy_id = %self.strategy_id, error = %e, "failed to persist closed perp position");
                }
                self.log_success("perp-close").await;
                info!(strategy_id = %self.strategy_id, market_index, "perp position closed");
            }
            Err(e) => {
                self.log_failure(&e.to_string()).await;
                warn!(strategy_id = %self.strategy_id, error = %e, "perp position close failed");
            }
        }
    }

    async fn log_success(&self, label: &str) {
        let now = Utc::now();
        let _ = self
            .deps
            .store
            .append_trade(
                &self.strategy_id,
                TradeLogEntry {
                    at: now,
                    success: true,
                    signature: Some(label.to_string()),
                    error_message: None,
                    input_amount: None,
                    output_amount: None,
                },
            )
            .await;
        self.deps.bus.publish(strategyd_core::TradeSuccessEvent {
            strategy_id: self.strategy_id.clone(),
            trading_wallet_pubkey: self.wallet_pubkey.clone(),
            strategy_kind: StrategyKind::PerpPosition,
            signature: label.to_string(),
            timestamp: now,
            amount: None,
            profit: None,
        });
        let _ = &self.trading_wallet_id;
    }

    async fn log_failure(&self, message: &str) {
        let _ = self
            .deps
            .store
            .append_trade(
                &self.strategy_id,
                TradeLogEntry {
                    at: Utc::now(),
                    success: false,
                    signature: None,
                    error_message: Some(message.to_string()),
                    input_amount: None,
                    output_amount: None,
                },
            )
            .await;
    }
}

#[async_trait]
impl Worker for PerpPositionWorker {
    fn strategy_id(&self) -> &StrategyId {
        &self.strategy_id
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::PerpPosition
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) {
        self.bootstrap_collateral().await;
        loop {
            self.tick().await;
            if !sleep_or_cancelled(T_PERP, &cancel).await {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixed_balance_rpc, fixed_oracle, memory_deps_for, test_keypair, FakePerpVenue};
    use strategyd_core::{Strategy, StrategyConfig};
    use strategyd_store::{InMemoryStrategyStore, StrategyRecord};

    fn config(direction: Direction) -> PerpPositionConfig {
        PerpPositionConfig {
            market_index: 0,
            direction,
            allocation_percentage: dec!(10),
            entry_price: dec!(100),
            exit_price: dec!(120),
            leverage: 2,
            stop_loss: Some(dec!(80)),
            take_profit: None,
            max_slippage: dec!(1),
            is_position_open: false,
            current_position: None,
        }
    }

    fn setup(
        direction: Direction,
        venue: Arc<FakePerpVenue>,
    ) -> (PerpPositionWorker, Arc<InMemoryStrategyStore>) {
        let cfg = config(direction);
        let store = Arc::new(InMemoryStrategyStore::new());
        let strategy = Strategy::new(
            "s1".into(),
            "w1".into(),
            "owner".into(),
            StrategyConfig::PerpPosition(cfg.clone()),
        )
        .unwrap();
        store.insert(StrategyRecord {
            strategy,
            trading_wallet_public_key: "pubkey".into(),
        });

        let oracle = fixed_oracle(vec![100.0]);
        let chain = fixed_balance_rpc(10_000_000_000, 0);
        let mut deps = memory_deps_for(store.clone(), chain, oracle);
        deps.perp_venue = venue;

        let worker = PerpPositionWorker::new("s1".into(), "w1".into(), "pubkey".into(), test_keypair(), deps, cfg);
        (worker, store)
    }

    #[tokio::test]
    async fn price_at_or_below_entry_opens_long_position() {
        let venue = Arc::new(FakePerpVenue::new(dec!(95)));
        let (worker, store) = setup(Direction::Long, venue);

        worker.tick().await;

        let record = store.get(&"s1".to_string().into()).await.unwrap().unwrap();
        assert_eq!(record.strategy.profit_tracking.trades.len(), 1);
        if let StrategyConfig::PerpPosition(cfg) = &record.strategy.config {
            assert!(cfg.is_position_open);
            assert!(cfg.current_position.is_some());
        } else {
            panic!("expected perp position config");
        }
    }

    #[tokio::test]
    async fn price_above_entry_does_not_open() {
        let venue = Arc::new(FakePerpVenue::new(dec!(150)));
        let (worker, store) = setup(Direction::Long, venue);

        worker.tick().await;

        let record = store.get(&"s1".to_string().into()).await.unwrap().unwrap();
        assert_eq!(record.strategy.profit_tracking.trades.len(), 0);
    }

    #[tokio::test]
    async fn exit_price_crossed_closes_open_position() {
        let venue = Arc::new(FakePerpVenue::new(dec!(95)));
        let (worker, store) = setup(Direction::Long, venue.clone());

        worker.tick().await;
        venue.set_mark_price(dec!(125));
        worker.tick().await;

        let record = store.get(&"s1".to_string().into()).await.unwrap().unwrap();
        assert_eq!(record.strategy.profit_tracking.trades.len(), 2);
        if let StrategyConfig::PerpPosition(cfg) = &record.strategy.config {
            assert!(!cfg.is_position_open);
            assert!(cfg.current_position.is_none());
        } else {
            panic!("expected perp position config");
        }
    }

    #[tokio::test]
    async fn stop_loss_hit_closes_open_position() {
        let venue = Arc::new(FakePerpVenue::new(dec!(95)));
        let (worker, store) = setup(Direction::Long, venue.clone());

        worker.tick().await;
        venue.set_mark_price(dec!(70));
        worker.tick().await;

        let record = store.get(&"s1".to_string().into()).await.unwrap().unwrap();
        if let StrategyConfig::PerpPosition(cfg) = &record.strategy.config {
            assert!(!cfg.is_position_open);
        } else {
            panic!("expected perp position config");
        }
    }

    #[tokio::test]
    async fn bootstrap_deposits_shortfall_when_collateral_below_target() {
        let venue = Arc::new(fixed_perp_venue_with_collateral(dec!(0)));
        let (worker, _store) = setup(Direction::Long, venue.clone());

        worker.bootstrap_collateral().await;

        assert_eq!(venue.deposits.lock().len(), 1);
    }

    fn fixed_perp_venue_with_collateral(collateral: Decimal) -> FakePerpVenue {
        let venue = FakePerpVenue::new(dec!(100));
        *venue.total_collateral.lock() = collateral;
        *venue.free_collateral.lock() = collateral;
        venue
    }
}
