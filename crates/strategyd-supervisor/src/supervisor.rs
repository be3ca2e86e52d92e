//! The Supervisor (C8 / §4.3): reconciles a desired set of active workers
//! against the Strategy Store on a poll interval, with at-most-one-worker-
//! per-strategy and no leaked workers after a configuration flip.

use crate::error::Result;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use strategyd_core::{StrategyId, StrategyKind};
use strategyd_store::StrategyStore;
use strategyd_telemetry::Metrics;
use strategyd_workers::{build_worker, spawn, sleep_or_cancelled, KeyEscrow, WorkerDeps, WorkerHandle};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Default reconcile interval (§4.3 "≈60 s").
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Summary of one reconcile cycle, returned for logging/testing — not part
/// of the public contract beyond observability.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub started: Vec<StrategyId>,
    pub restarted: Vec<StrategyId>,
    pub stopped_inactive: Vec<StrategyId>,
    pub stopped_orphaned: Vec<StrategyId>,
    pub construction_failures: Vec<StrategyId>,
}

pub struct Supervisor {
    store: Arc<dyn StrategyStore>,
    escrow: Arc<dyn KeyEscrow>,
    deps: WorkerDeps,
    poll_interval: Duration,
    workers: Mutex<HashMap<StrategyId, (StrategyKind, WorkerHandle)>>,
}

impl Supervisor {
    pub fn new(
        store: Arc<dyn StrategyStore>,
        escrow: Arc<dyn KeyEscrow>,
        deps: WorkerDeps,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            escrow,
            deps,
            poll_interval,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Runs one full reconcile, then loops on `poll_interval` until
    /// `cancel` fires, per §4.3 "Startup". On a reconcile error the wait
    /// before the next attempt is doubled once, then normal cadence
    /// resumes.
    pub async fn run(&self, cancel: CancellationToken) {
        Metrics::set_supervisor_up(true);

        if let Err(e) = self.reconcile().await {
            error!(error = %e, "initial reconcile failed");
        }

        let mut backoff_next = false;
        loop {
            let wait = if backoff_next {
                self.poll_interval * 2
            } else {
                self.poll_interval
            };
            backoff_next = false;

            if !sleep_or_cancelled(wait, &cancel).await {
                break;
            }

            match self.reconcile().await {
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "reconcile cycle failed, doubling next wait");
                    backoff_next = true;
                }
            }
        }

        self.shutdown().await;
        Metrics::set_supervisor_up(false);
    }

    /// One reconcile cycle (§4.3 steps 1-4). Never panics; worker
    /// construction failures are logged and skipped, not propagated.
    pub async fn reconcile(&self) -> Result<ReconcileSummary> {
        let start = std::time::Instant::now();
        let result = self.reconcile_inner().await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        Metrics::record_reconcile(outcome, start.elapsed().as_secs_f64());
        self.report_live_worker_counts().await;
        result
    }

    async fn reconcile_inner(&self) -> Result<ReconcileSummary> {
        let rows = self.store.list_all().await?;
        let fetched: HashSet<StrategyId> = rows.iter().map(|r| r.strategy.id.clone()).collect();
        let mut summary = ReconcileSummary::default();

        for row in rows {
            let id = row.strategy.id.clone();
            let kind = row.strategy.kind;

            if !row.strategy.is_active {
                let existing = self.workers.lock().await.remove(&id);
                if let Some((_, handle)) = existing {
                    info!(strategy_id = %id, "stopping worker for deactivated strategy");
                    handle.stop().await;
                    summary.stopped_inactive.push(id);
                }
                continue;
            }

            let has_live = self.workers.lock().await.contains_key(&id);

            if !has_live {
                match build_worker(row, self.deps.clone(), self.escrow.as_ref()).await {
                    Ok(worker) => {
                        let handle = spawn(worker);
                        self.workers.lock().await.insert(id.clone(), (kind, handle));
                        info!(strategy_id = %id, kind = %kind, "started worker");
                        summary.started.push(id);
                    }
                    Err(e) => {
                        warn!(strategy_id = %id, kind = %kind, error = %e, "worker construction failed, will retry next cycle");
                        Metrics::record_worker_construction_failure(kind.as_str());
                        summary.construction_failures.push(id);
                    }
                }
                continue;
            }

            if kind == StrategyKind::PriceMonitor {
                // Workers are stateless w.r.t. config changes (§4.3 step 2):
                // stop-and-restart is how a PriceMonitor picks up an
                // external config update. Reuse the row already fetched
                // this cycle rather than re-reading the Store.
                let existing = self.workers.lock().await.remove(&id);
                if let Some((_, handle)) = existing {
                    handle.stop().await;
                }
                match build_worker(row, self.deps.clone(), self.escrow.as_ref()).await {
                    Ok(worker) => {
                        let handle = spawn(worker);
                        self.workers.lock().await.insert(id.clone(), (kind, handle));
                        summary.restarted.push(id);
                    }
                    Err(e) => {
                        warn!(strategy_id = %id, error = %e, "price monitor restart failed, will retry next cycle");
                        Metrics::record_worker_construction_failure(kind.as_str());
                        summary.construction_failures.push(id);
                    }
                }
            }
        }

        let orphaned: Vec<StrategyId> = {
            let workers = self.workers.lock().await;
            workers
                .keys()
                .filter(|id| !fetched.contains(*id))
                .cloned()
                .collect()
        };
        for id in orphaned {
            let existing = self.workers.lock().await.remove(&id);
            if let Some((_, handle)) = existing {
                info!(strategy_id = %id, "stopping orphaned worker (strategy row removed)");
                handle.stop().await;
                summary.stopped_orphaned.push(id);
            }
        }

        Ok(summary)
    }

    async fn report_live_worker_counts(&self) {
        let mut counts: HashMap<&'static str, i64> = HashMap::new();
        for (kind, _) in self.workers.lock().await.values() {
            *counts.entry(kind.as_str()).or_insert(0) += 1;
        }
        for kind in [
            StrategyKind::PriceMonitor,
            StrategyKind::WalletMonitor,
            StrategyKind::Vault,
            StrategyKind::Levels,
            StrategyKind::PairTrade,
            StrategyKind::PerpPosition,
        ] {
            Metrics::set_live_workers(kind.as_str(), *counts.get(kind.as_str()).unwrap_or(&0));
        }
    }

    /// Stops every live worker, best-effort, logging per-worker errors
    /// (§4.3 "Startup"/shutdown, §6.6). Used both by `run`'s exit path and
    /// directly by callers handling SIGINT/SIGTERM.
    pub async fn shutdown(&self) {
        let handles: Vec<(StrategyId, WorkerHandle)> = {
            let mut workers = self.workers.lock().await;
            workers.drain().map(|(id, (_, h))| (id, h)).collect()
        };
        for (id, handle) in handles {
            info!(strategy_id = %id, "stopping worker for shutdown");
            handle.stop().await;
        }
    }

    /// Number of currently live workers, for tests and health checks.
    pub async fn live_worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use solana_sdk::signature::{Keypair, Signer};
    use std::sync::Arc;
    use strategyd_catalog::{InMemoryTokenCatalog, TokenCategory, TokenInfo};
    use strategyd_chain::{
        AccountInfo, ChainError, ChainRpc, Confirmation, LogsCallback, LogsSubscriptionId,
        ObservedSwap,
    };
    use strategyd_core::{
        Direction, PairToken, PerpPosition, PriceDirection, PriceMonitorConfig, Strategy,
        StrategyConfig,
    };
    use strategyd_oracle::{PairTradeSignal, PairTrigger, PriceOracle};
    use strategyd_store::{InMemoryStrategyStore, StrategyRecord};
    use strategyd_swap::SwapDriver;
    use strategyd_swap::{Quote, SwapService};
    use strategyd_workers::perp_venue::{OpenPositionRequest, PerpVenueError};
    use strategyd_workers::{EscrowError, KeyEscrow, PerpVenue};
    use std::collections::HashMap;
    use strategyd_core::TradingWalletId;

    /// A fixed-key escrow for these tests: maps wallet id to raw key bytes.
    /// `strategyd-workers`' own `escrow::fake::FakeKeyEscrow` is
    /// `#[cfg(test)]`-gated inside that crate and isn't visible here.
    struct FakeKeyEscrow {
        keys: HashMap<String, Vec<u8>>,
    }

    impl FakeKeyEscrow {
        fn new() -> Self {
            Self {
                keys: HashMap::new(),
            }
        }

        fn with_keypair(mut self, wallet_id: &str, keypair: &Keypair) -> Self {
            self.keys.insert(wallet_id.to_string(), keypair.to_bytes().to_vec());
            self
        }
    }

    #[async_trait]
    impl KeyEscrow for FakeKeyEscrow {
        async fn private_key_bytes(
            &self,
            trading_wallet_id: &TradingWalletId,
        ) -> std::result::Result<[u8; 64], EscrowError> {
            let bytes = self.keys.get(trading_wallet_id.as_str()).ok_or_else(|| {
                EscrowError::DecryptionFailed(trading_wallet_id.clone(), "unknown wallet".into())
            })?;
            if bytes.len() != 64 {
                return Err(EscrowError::InvalidKeyLength(
                    trading_wallet_id.clone(),
                    bytes.len(),
                ));
            }
            let mut out = [0u8; 64];
            out.copy_from_slice(bytes);
            Ok(out)
        }
    }

    struct NoopChain;

    #[async_trait]
    impl ChainRpc for NoopChain {
        async fn native_balance(&self, _pubkey: &str) -> strategyd_chain::Result<u64> {
            Ok(10_000_000_000)
        }

        async fn token_balance(&self, _owner: &str, _mint: &str) -> strategyd_chain::Result<u64> {
            Ok(0)
        }

        async fn parsed_account_info(
            &self,
            _address: &str,
        ) -> strategyd_chain::Result<Option<AccountInfo>> {
            Ok(None)
        }

        async fn latest_blockhash(&self) -> strategyd_chain::Result<String> {
            Ok("11111111111111111111111111111111".to_string())
        }

        async fn submit_transaction(&self, _tx_base64: &str) -> strategyd_chain::Result<String> {
            Ok("noop-signature".to_string())
        }

        async fn confirm_transaction(
            &self,
            _signature: &str,
        ) -> strategyd_chain::Result<Confirmation> {
            Ok(Confirmation {
                confirmed: true,
                slot: Some(1),
                err: None,
            })
        }

        async fn on_logs(
            &self,
            _address: &str,
            _callback: LogsCallback,
        ) -> strategyd_chain::Result<LogsSubscriptionId> {
            Ok(LogsSubscriptionId::from_raw(1))
        }

        async fn remove_on_logs(&self, _id: LogsSubscriptionId) -> strategyd_chain::Result<()> {
            Err(ChainError::UnknownSubscription)
        }

        async fn observed_swap(
            &self,
            _signature: &str,
            _owner: &str,
        ) -> strategyd_chain::Result<Option<ObservedSwap>> {
            Ok(None)
        }
    }

    struct NoopOracle;

    #[async_trait]
    impl PriceOracle for NoopOracle {
        async fn price(&self, _symbol: &str) -> strategyd_oracle::Result<f64> {
            Ok(100.0)
        }
    }

    struct NoopPairSignal;

    #[async_trait]
    impl PairTradeSignal for NoopPairSignal {
        async fn trigger(&self, _pair_key: &str) -> strategyd_oracle::Result<PairTrigger> {
            Ok(PairTrigger {
                trigger_swap: false,
                current_direction: PairToken::A,
            })
        }

        async fn preferred_initial_token(&self, _pair_key: &str) -> strategyd_oracle::Result<PairToken> {
            Ok(PairToken::A)
        }
    }

    struct NoopPerpVenue;

    #[async_trait]
    impl PerpVenue for NoopPerpVenue {
        async fn mark_price(&self, _market_index: u32) -> std::result::Result<Decimal, PerpVenueError> {
            Ok(dec!(100))
        }

        async fn position(
            &self,
            _market_index: u32,
            _owner: &str,
        ) -> std::result::Result<Option<PerpPosition>, PerpVenueError> {
            Ok(None)
        }

        async fn total_collateral(&self, _owner: &str) -> std::result::Result<Decimal, PerpVenueError> {
            Ok(Decimal::ZERO)
        }

        async fn free_collateral(&self, _owner: &str) -> std::result::Result<Decimal, PerpVenueError> {
            Ok(Decimal::ZERO)
        }

        async fn deposit_collateral(
            &self,
            _owner: &str,
            _amount: Decimal,
            _wallet_keypair: Arc<Keypair>,
        ) -> std::result::Result<String, PerpVenueError> {
            Ok("noop-sig".to_string())
        }

        async fn open_position(
            &self,
            _request: OpenPositionRequest,
        ) -> std::result::Result<PerpPosition, PerpVenueError> {
            Err(PerpVenueError::Request("noop venue does not open positions".into()))
        }

        async fn close_position(
            &self,
            _market_index: u32,
            _owner: &str,
            _wallet_keypair: Arc<Keypair>,
        ) -> std::result::Result<String, PerpVenueError> {
            Err(PerpVenueError::NoOpenPosition)
        }
    }

    struct NoopSwapService;

    #[async_trait]
    impl SwapService for NoopSwapService {
        async fn quote(
            &self,
            _input_mint: &strategyd_core::Mint,
            _output_mint: &strategyd_core::Mint,
            _amount: u64,
            _slippage_bps: u16,
            _platform_fee_bps: Option<u16>,
        ) -> strategyd_swap::Result<Quote> {
            Err(strategyd_swap::SwapError::Fatal("noop swap service".into()))
        }

        async fn build_swap(
            &self,
            _quote: &Quote,
            _user_pubkey: &str,
            _fee_account: Option<&str>,
        ) -> strategyd_swap::Result<String> {
            Err(strategyd_swap::SwapError::Fatal("noop swap service".into()))
        }
    }

    fn test_deps(store: Arc<dyn StrategyStore>) -> WorkerDeps {
        let catalog = InMemoryTokenCatalog::new();
        catalog.seed(TokenInfo {
            mint: "native".into(),
            symbol: "SOL".into(),
            decimals: 9,
            category: TokenCategory::Native,
        });
        catalog.seed(TokenInfo {
            mint: "quote".into(),
            symbol: "USDC".into(),
            decimals: 6,
            category: TokenCategory::Stablecoin,
        });

        let bus = strategyd_bus::TradeEventBus::new();
        let chain: Arc<dyn ChainRpc> = Arc::new(NoopChain);
        let swap = Arc::new(SwapDriver::new(
            Arc::new(NoopSwapService),
            chain.clone(),
            bus.clone(),
            "native".into(),
            5_000_000,
        ));

        WorkerDeps {
            store,
            bus,
            chain,
            oracle: Arc::new(NoopOracle),
            pair_signal: Arc::new(NoopPairSignal),
            perp_venue: Arc::new(NoopPerpVenue),
            catalog: Arc::new(catalog),
            swap,
            native_mint: "native".into(),
            quote_mint: "quote".into(),
            quote_symbol: "USDC".into(),
            native_symbol: "SOL".into(),
            fee_reserve_lamports: 5_000_000,
        }
    }

    fn price_monitor_record(id: &str, wallet_id: &str, keypair: &Keypair, is_active: bool) -> StrategyRecord {
        let config = StrategyConfig::PriceMonitor(PriceMonitorConfig {
            target_price: Decimal::from(200),
            direction: PriceDirection::Above,
            percentage_to_sell: Decimal::from(50),
        });
        let mut strategy =
            Strategy::new(id.into(), wallet_id.into(), "owner".into(), config).unwrap();
        strategy.is_active = is_active;
        StrategyRecord {
            strategy,
            trading_wallet_public_key: keypair.pubkey().to_string(),
        }
    }

    fn harness() -> (Arc<InMemoryStrategyStore>, Arc<FakeKeyEscrow>, Keypair) {
        let store = Arc::new(InMemoryStrategyStore::new());
        let keypair = Keypair::new();
        let escrow = Arc::new(FakeKeyEscrow::new().with_keypair("wallet-1", &keypair));
        (store, escrow, keypair)
    }

    #[tokio::test]
    async fn reconcile_starts_worker_for_newly_active_strategy() {
        let (store, escrow, keypair) = harness();
        store.insert(price_monitor_record("s1", "wallet-1", &keypair, true));

        let deps = test_deps(store.clone());
        let supervisor = Supervisor::new(store.clone(), escrow.clone(), deps, Duration::from_secs(60));

        let summary = supervisor.reconcile().await.unwrap();
        assert_eq!(summary.started, vec![StrategyId::from("s1")]);
        assert_eq!(supervisor.live_worker_count().await, 1);

        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn reconcile_stops_worker_once_strategy_deactivated() {
        let (store, escrow, keypair) = harness();
        store.insert(price_monitor_record("s1", "wallet-1", &keypair, true));

        let deps = test_deps(store.clone());
        let supervisor = Supervisor::new(store.clone(), escrow.clone(), deps, Duration::from_secs(60));

        supervisor.reconcile().await.unwrap();
        assert_eq!(supervisor.live_worker_count().await, 1);

        store.update_active(&"s1".to_string().into(), false).await.unwrap();
        let summary = supervisor.reconcile().await.unwrap();

        assert_eq!(summary.stopped_inactive, vec![StrategyId::from("s1")]);
        assert_eq!(supervisor.live_worker_count().await, 0);

        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn reconcile_stops_orphaned_worker_once_row_disappears() {
        let (store, escrow, keypair) = harness();
        store.insert(price_monitor_record("s1", "wallet-1", &keypair, true));

        let deps = test_deps(store.clone());
        let supervisor = Supervisor::new(store.clone(), escrow.clone(), deps, Duration::from_secs(60));

        supervisor.reconcile().await.unwrap();
        assert_eq!(supervisor.live_worker_count().await, 1);

        store.remove(&"s1".to_string().into());
        let summary = supervisor.reconcile().await.unwrap();

        assert_eq!(summary.stopped_orphaned, vec![StrategyId::from("s1")]);
        assert_eq!(supervisor.live_worker_count().await, 0);

        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn reconcile_restarts_price_monitor_worker_every_cycle() {
        let (store, escrow, keypair) = harness();
        store.insert(price_monitor_record("s1", "wallet-1", &keypair, true));

        let deps = test_deps(store.clone());
        let supervisor = Supervisor::new(store.clone(), escrow.clone(), deps, Duration::from_secs(60));

        let first = supervisor.reconcile().await.unwrap();
        assert_eq!(first.started, vec![StrategyId::from("s1")]);

        let second = supervisor.reconcile().await.unwrap();
        assert_eq!(second.restarted, vec![StrategyId::from("s1")]);
        assert!(second.started.is_empty());
        assert_eq!(supervisor.live_worker_count().await, 1);

        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn construction_failure_is_recorded_and_skipped() {
        let store = Arc::new(InMemoryStrategyStore::new());
        // No matching keypair registered in the escrow for this wallet id,
        // so worker construction fails during key decryption.
        let escrow = Arc::new(FakeKeyEscrow::new());
        let keypair = Keypair::new();
        store.insert(price_monitor_record("s1", "wallet-1", &keypair, true));

        let deps = test_deps(store.clone());
        let supervisor = Supervisor::new(store.clone(), escrow, deps, Duration::from_secs(60));

        let summary = supervisor.reconcile().await.unwrap();
        assert_eq!(summary.construction_failures, vec![StrategyId::from("s1")]);
        assert_eq!(supervisor.live_worker_count().await, 0);
    }
}
