//! Shared dependencies every worker constructor takes. Bundled into one
//! struct so the Supervisor only needs to assemble it once per process,
//! per §9's "construct infrastructure at process start, pass by explicit
//! dependency injection" redesign note.

use crate::perp_venue::PerpVenue;
use std::sync::Arc;
use strategyd_bus::TradeEventBus;
use strategyd_catalog::TokenCatalog;
use strategyd_chain::ChainRpc;
use strategyd_core::Mint;
use strategyd_oracle::{PairTradeSignal, PriceOracle};
use strategyd_store::StrategyStore;
use strategyd_swap::SwapDriver;

#[derive(Clone)]
pub struct WorkerDeps {
    pub store: Arc<dyn StrategyStore>,
    pub bus: TradeEventBus,
    pub chain: Arc<dyn ChainRpc>,
    pub oracle: Arc<dyn PriceOracle>,
    /// Consulted only by the PairTrade worker for its flip-trigger signal.
    pub pair_signal: Arc<dyn PairTradeSignal>,
    /// Consulted only by the PerpPosition worker.
    pub perp_venue: Arc<dyn PerpVenue>,
    pub catalog: Arc<dyn TokenCatalog>,
    pub swap: Arc<SwapDriver>,
    /// The chain's native token (e.g. wrapped SOL): used as the universal
    /// fee-bearing and "native_balance" mint.
    pub native_mint: Mint,
    /// The quote currency levels/pair-trade configs denominate buy-side
    /// amounts in (commonly USDC).
    pub quote_mint: Mint,
    pub quote_symbol: String,
    /// Oracle symbol for the native token (e.g. "SOL"), used by any worker
    /// that compares a native spot price against a configured target.
    pub native_symbol: String,
    pub fee_reserve_lamports: u64,
}
