//! Wires every component (C1-C9) from a loaded [`AppConfig`] and runs the
//! Supervisor until a shutdown signal arrives.

use crate::config::{AppConfig, StoreConfig};
use crate::error::AppResult;
use std::sync::Arc;
use std::time::Duration;
use strategyd_bus::TradeEventBus;
use strategyd_catalog::{InMemoryTokenCatalog, TokenCatalog, TokenInfo};
use strategyd_chain::{ChainRpc, SolanaChainRpc};
use strategyd_core::Mint;
use strategyd_marketplace::MarketplaceService;
use strategyd_oracle::{CachingPriceOracle, HttpPairSignalSource, HttpPriceOracle, PairTradeSignal, PriceOracle};
use strategyd_store::{InMemoryStrategyStore, NoopTransactionLog, PgStrategyStore, PgTransactionLog, StrategyStore};
use strategyd_supervisor::Supervisor;
use strategyd_swap::{JupiterSwapService, SwapDriver, TransactionLog};
use strategyd_workers::{HttpKeyEscrow, HttpPerpVenue, KeyEscrow, PerpVenue, WorkerDeps};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct Application {
    store: Arc<dyn StrategyStore>,
    escrow: Arc<dyn KeyEscrow>,
    deps: WorkerDeps,
    poll_interval: Duration,
    pub marketplace: MarketplaceService,
}

impl Application {
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        let mut pg_pool: Option<sqlx::PgPool> = None;
        let store: Arc<dyn StrategyStore> = match &config.store {
            StoreConfig::Postgres { database_url } => {
                let store = PgStrategyStore::connect(database_url).await?;
                store.run_migrations().await?;
                pg_pool = Some(store.pool());
                Arc::new(store)
            }
            StoreConfig::Memory => Arc::new(InMemoryStrategyStore::new()),
        };

        let chain: Arc<dyn ChainRpc> =
            Arc::new(SolanaChainRpc::new(&config.chain.rpc_url, &config.chain.ws_url));

        let oracle: Arc<dyn PriceOracle> = if config.oracle.cache_ttl_secs > 0 {
            let inner = HttpPriceOracle::new(&config.oracle.base_url)?;
            Arc::new(CachingPriceOracle::with_ttl(
                inner,
                Duration::from_secs(config.oracle.cache_ttl_secs),
            ))
        } else {
            Arc::new(HttpPriceOracle::new(&config.oracle.base_url)?)
        };

        let pair_signal: Arc<dyn PairTradeSignal> =
            Arc::new(HttpPairSignalSource::new(&config.pair_signal.base_url)?);

        let catalog: Arc<dyn TokenCatalog> = {
            let catalog = InMemoryTokenCatalog::new();
            for token in &config.catalog {
                catalog.seed(TokenInfo {
                    mint: Mint::from(token.mint.clone()),
                    symbol: token.symbol.clone(),
                    decimals: token.decimals,
                    category: token.category,
                });
            }
            Arc::new(catalog)
        };

        let swap_service: Arc<dyn strategyd_swap::SwapService> =
            Arc::new(JupiterSwapService::new(&config.swap.base_url)?);

        let bus = TradeEventBus::new();
        let native_mint = Mint::from(config.native_mint.clone());

        let mut driver = SwapDriver::new(
            swap_service,
            chain.clone(),
            bus.clone(),
            native_mint.clone(),
            config.swap.fee_reserve_lamports,
        );
        let tx_log: Arc<dyn TransactionLog> = match pg_pool {
            Some(pool) => Arc::new(PgTransactionLog::new(pool)),
            None => Arc::new(NoopTransactionLog),
        };
        driver = driver.with_transaction_log(tx_log);
        let swap = Arc::new(driver);

        let perp_venue: Arc<dyn PerpVenue> =
            Arc::new(HttpPerpVenue::new(&config.perp_venue.base_url, chain.clone())?);

        let escrow: Arc<dyn KeyEscrow> = Arc::new(HttpKeyEscrow::new(&config.escrow.base_url)?);

        let deps = WorkerDeps {
            store: store.clone(),
            bus,
            chain,
            oracle,
            pair_signal,
            perp_venue,
            catalog,
            swap,
            native_mint,
            quote_mint: Mint::from(config.quote_mint.clone()),
            quote_symbol: config.quote_symbol.clone(),
            native_symbol: config.native_symbol.clone(),
            fee_reserve_lamports: config.swap.fee_reserve_lamports,
        };

        let marketplace = MarketplaceService::new(store.clone());

        Ok(Self {
            store,
            escrow,
            deps,
            poll_interval: config.poll_interval(),
            marketplace,
        })
    }

    /// Runs the Supervisor's reconcile loop until SIGINT or SIGTERM
    /// arrives, then waits for every worker to stop before returning.
    pub async fn run(self) -> AppResult<()> {
        let supervisor = Supervisor::new(self.store, self.escrow, self.deps, self.poll_interval);
        let cancel = CancellationToken::new();

        let watcher_cancel = cancel.clone();
        let watcher = tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            info!("shutdown signal received, stopping supervisor");
            watcher_cancel.cancel();
        });

        supervisor.run(cancel).await;
        watcher.abort();

        Ok(())
    }
}

/// Resolves once either SIGINT or SIGTERM is received (§6.6). Falls back to
/// ctrl-c alone on non-unix targets, where SIGTERM has no equivalent.
#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to install SIGTERM handler, watching SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
