//! Shared test fixtures for the worker test modules: fake chain RPC, fake
//! price oracle, fake swap service, and a [`WorkerDeps`] assembled from
//! them. Kept in one place so each worker's tests stay focused on its own
//! state-machine behavior rather than re-deriving plumbing.

#![cfg(test)]

use crate::context::WorkerDeps;
use crate::perp_venue::{OpenPositionRequest, PerpVenue, PerpVenueError};
use async_trait::async_trait;
use base64::Engine;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::VersionedTransaction;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use strategyd_bus::TradeEventBus;
use strategyd_catalog::{InMemoryTokenCatalog, TokenCategory, TokenInfo};
use strategyd_chain::{
    AccountInfo, ChainError, ChainRpc, Confirmation, LogEvent, LogsCallback, LogsSubscriptionId,
    ObservedSwap,
};
use strategyd_core::{Mint, PairToken, PerpPosition};
use strategyd_oracle::{OracleError, PairTradeSignal, PairTrigger, PriceOracle};
use strategyd_store::StrategyStore;
use strategyd_swap::{Quote, Result as SwapResult, SwapDriver, SwapError, SwapService};

pub struct FakeChainRpc {
    pub native: AtomicU64,
    pub token: AtomicU64,
    pub fail_submit: std::sync::atomic::AtomicBool,
    log_callback: Mutex<Option<LogsCallback>>,
    observed_swaps: Mutex<HashMap<String, ObservedSwap>>,
}

impl FakeChainRpc {
    pub fn new(native: u64, token: u64) -> Self {
        Self {
            native: AtomicU64::new(native),
            token: AtomicU64::new(token),
            fail_submit: std::sync::atomic::AtomicBool::new(false),
            log_callback: Mutex::new(None),
            observed_swaps: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_native(&self, value: u64) {
        self.native.store(value, Ordering::SeqCst);
    }

    /// Registers the observed swap `observed_swap` should return for
    /// `signature`, and delivers a log event for it if a subscriber is
    /// registered.
    pub fn emit_log(&self, signature: &str, swap: ObservedSwap) {
        self.observed_swaps
            .lock()
            .insert(signature.to_string(), swap);
        if let Some(cb) = self.log_callback.lock().as_ref() {
            cb(LogEvent {
                signature: signature.to_string(),
                logs: vec![],
                err: None,
            });
        }
    }
}

#[async_trait]
impl ChainRpc for FakeChainRpc {
    async fn native_balance(&self, _pubkey: &str) -> strategyd_chain::Result<u64> {
        Ok(self.native.load(Ordering::SeqCst))
    }

    async fn token_balance(&self, _owner: &str, _mint: &str) -> strategyd_chain::Result<u64> {
        Ok(self.token.load(Ordering::SeqCst))
    }

    async fn parsed_account_info(&self, _address: &str) -> strategyd_chain::Result<Option<AccountInfo>> {
        Ok(None)
    }

    async fn latest_blockhash(&self) -> strategyd_chain::Result<String> {
        Ok("11111111111111111111111111111111".to_string())
    }

    async fn submit_transaction(&self, _tx_base64: &str) -> strategyd_chain::Result<String> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc("submit failed".into()));
        }
        Ok("fake-signature".to_string())
    }

    async fn confirm_transaction(&self, _signature: &str) -> strategyd_chain::Result<Confirmation> {
        Ok(Confirmation {
            confirmed: true,
            slot: Some(1),
            err: None,
        })
    }

    async fn on_logs(&self, _address: &str, callback: LogsCallback) -> strategyd_chain::Result<LogsSubscriptionId> {
        *self.log_callback.lock() = Some(callback);
        Ok(LogsSubscriptionId::from_raw(1))
    }

    async fn remove_on_logs(&self, _id: LogsSubscriptionId) -> strategyd_chain::Result<()> {
        *self.log_callback.lock() = None;
        Ok(())
    }

    async fn observed_swap(&self, signature: &str, _owner: &str) -> strategyd_chain::Result<Option<ObservedSwap>> {
        Ok(self.observed_swaps.lock().get(signature).cloned())
    }
}

pub fn fixed_balance_rpc(native: u64, token: u64) -> Arc<dyn ChainRpc> {
    Arc::new(FakeChainRpc::new(native, token))
}

pub struct SequenceOracle {
    prices: Vec<f64>,
    idx: AtomicUsize,
}

#[async_trait]
impl PriceOracle for SequenceOracle {
    async fn price(&self, _symbol: &str) -> Result<f64, OracleError> {
        let i = self.idx.fetch_add(1, Ordering::SeqCst);
        Ok(*self.prices.get(i).unwrap_or(self.prices.last().unwrap()))
    }
}

pub fn fixed_oracle(prices: Vec<f64>) -> Arc<dyn PriceOracle> {
    Arc::new(SequenceOracle {
        prices,
        idx: AtomicUsize::new(0),
    })
}

/// A pair-signal fake that returns a fixed, settable trigger and preferred
/// initial token.
pub struct FakePairSignal {
    pub trigger_swap: std::sync::atomic::AtomicBool,
    pub current_direction: Mutex<PairToken>,
    pub preferred_initial: Mutex<PairToken>,
}

impl FakePairSignal {
    pub fn new(preferred_initial: PairToken) -> Self {
        Self {
            trigger_swap: std::sync::atomic::AtomicBool::new(false),
            current_direction: Mutex::new(preferred_initial),
            preferred_initial: Mutex::new(preferred_initial),
        }
    }

    pub fn set(&self, trigger_swap: bool, current_direction: PairToken) {
        self.trigger_swap.store(trigger_swap, Ordering::SeqCst);
        *self.current_direction.lock() = current_direction;
    }
}

#[async_trait]
impl PairTradeSignal for FakePairSignal {
    async fn trigger(&self, _pair_key: &str) -> strategyd_oracle::Result<PairTrigger> {
        Ok(PairTrigger {
            trigger_swap: self.trigger_swap.load(Ordering::SeqCst),
            current_direction: *self.current_direction.lock(),
        })
    }

    async fn preferred_initial_token(&self, _pair_key: &str) -> strategyd_oracle::Result<PairToken> {
        Ok(*self.preferred_initial.lock())
    }
}

pub fn fixed_pair_signal(preferred_initial: PairToken) -> Arc<dyn PairTradeSignal> {
    Arc::new(FakePairSignal::new(preferred_initial))
}

/// Always succeeds with a 1:1 quote and a minimal zero-instruction unsigned
/// transaction (just a fee payer) so the driver's local signing step has
/// something real to sign.
pub struct AlwaysSucceedsSwapService;

#[async_trait]
impl SwapService for AlwaysSucceedsSwapService {
    async fn quote(
        &self,
        _input_mint: &Mint,
        _output_mint: &Mint,
        amount: u64,
        slippage_bps: u16,
        _platform_fee_bps: Option<u16>,
    ) -> SwapResult<Quote> {
        Ok(Quote {
            in_amount: amount,
            out_amount: amount,
            slippage_bps,
            route_plan: serde_json::json!({}),
        })
    }

    async fn build_swap(
        &self,
        _quote: &Quote,
        user_pubkey: &str,
        _fee_account: Option<&str>,
    ) -> SwapResult<String> {
        Ok(unsigned_tx_for(user_pubkey))
    }
}

/// Fails with a slippage-shaped error below `succeeds_at_bps`, succeeds at
/// or above it.
pub struct SlippageUntilRungSwapService {
    pub succeeds_at_bps: u16,
}

#[async_trait]
impl SwapService for SlippageUntilRungSwapService {
    async fn quote(
        &self,
        _input_mint: &Mint,
        _output_mint: &Mint,
        amount: u64,
        slippage_bps: u16,
        _platform_fee_bps: Option<u16>,
    ) -> SwapResult<Quote> {
        Ok(Quote {
            in_amount: amount,
            out_amount: amount,
            slippage_bps,
            route_plan: serde_json::json!({}),
        })
    }

    async fn build_swap(
        &self,
        quote: &Quote,
        user_pubkey: &str,
        _fee_account: Option<&str>,
    ) -> SwapResult<String> {
        if quote.slippage_bps < self.succeeds_at_bps {
            return Err(SwapError::Build("slippage tolerance exceeded".into()));
        }
        Ok(unsigned_tx_for(user_pubkey))
    }
}

fn unsigned_tx_for(user_pubkey: &str) -> String {
    let payer = user_pubkey.parse::<Pubkey>().unwrap_or_default();
    let message = Message::new(&[], Some(&payer));
    let tx = VersionedTransaction {
        signatures: vec![solana_sdk::signature::Signature::default()],
        message: solana_sdk::message::VersionedMessage::Legacy(message),
    };
    let bytes = bincode::serialize(&tx).expect("serialize fake tx");
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn test_keypair() -> Arc<Keypair> {
    Arc::new(Keypair::new())
}

/// A perp venue fake with settable mark price, position, and collateral,
/// driven entirely in-memory.
pub struct FakePerpVenue {
    pub mark_price: Mutex<Decimal>,
    pub position: Mutex<Option<PerpPosition>>,
    pub total_collateral: Mutex<Decimal>,
    pub free_collateral: Mutex<Decimal>,
    pub deposits: Mutex<Vec<Decimal>>,
    pub fail_open: std::sync::atomic::AtomicBool,
}

impl FakePerpVenue {
    pub fn new(mark_price: Decimal) -> Self {
        Self {
            mark_price: Mutex::new(mark_price),
            position: Mutex::new(None),
            total_collateral: Mutex::new(Decimal::from(1_000)),
            free_collateral: Mutex::new(Decimal::from(1_000)),
            deposits: Mutex::new(Vec::new()),
            fail_open: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn set_mark_price(&self, price: Decimal) {
        *self.mark_price.lock() = price;
    }

    pub fn set_position(&self, position: Option<PerpPosition>) {
        *self.position.lock() = position;
    }
}

#[async_trait]
impl PerpVenue for FakePerpVenue {
    async fn mark_price(&self, _market_index: u32) -> crate::perp_venue::Result<Decimal> {
        Ok(*self.mark_price.lock())
    }

    async fn position(&self, _market_index: u32, _owner: &str) -> crate::perp_venue::Result<Option<PerpPosition>> {
        Ok(self.position.lock().clone())
    }

    async fn total_collateral(&self, _owner: &str) -> crate::perp_venue::Result<Decimal> {
        Ok(*self.total_collateral.lock())
    }

    async fn free_collateral(&self, _owner: &str) -> crate::perp_venue::Result<Decimal> {
        Ok(*self.free_collateral.lock())
    }

    async fn deposit_collateral(
        &self,
        _owner: &str,
        amount: Decimal,
        _wallet_keypair: Arc<Keypair>,
    ) -> crate::perp_venue::Result<String> {
        self.deposits.lock().push(amount);
        *self.total_collateral.lock() += amount;
        *self.free_collateral.lock() += amount;
        Ok("fake-deposit-signature".to_string())
    }

    async fn open_position(&self, request: OpenPositionRequest) -> crate::perp_venue::Result<PerpPosition> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(PerpVenueError::Request("open rejected".into()));
        }
        let price = *self.mark_price.lock();
        let position = PerpPosition {
            market_index: request.market_index,
            direction: request.direction,
            base_qty: request.base_qty,
            quote_qty: request.base_qty * price,
            entry_price: price,
            leverage: request.leverage,
            liquidation_price: Decimal::ZERO,
            margin_ratio: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            current_price: price,
        };
        *self.position.lock() = Some(position.clone());
        Ok(position)
    }

    async fn close_position(
        &self,
        _market_index: u32,
        _owner: &str,
        _wallet_keypair: Arc<Keypair>,
    ) -> crate::perp_venue::Result<String> {
        if self.position.lock().take().is_none() {
            return Err(PerpVenueError::NoOpenPosition);
        }
        Ok("fake-close-signature".to_string())
    }
}

pub fn fixed_perp_venue(mark_price: Decimal) -> Arc<dyn PerpVenue> {
    Arc::new(FakePerpVenue::new(mark_price))
}

pub fn memory_deps_for(
    store: Arc<dyn StrategyStore>,
    chain: Arc<dyn ChainRpc>,
    oracle: Arc<dyn PriceOracle>,
) -> WorkerDeps {
    memory_deps_with_swap(store, chain, oracle, Arc::new(AlwaysSucceedsSwapService))
}

pub fn memory_deps_with_swap(
    store: Arc<dyn StrategyStore>,
    chain: Arc<dyn ChainRpc>,
    oracle: Arc<dyn PriceOracle>,
    swap_service: Arc<dyn SwapService>,
) -> WorkerDeps {
    memory_deps_full(store, chain, oracle, swap_service, fixed_pair_signal(PairToken::A))
}

pub fn memory_deps_full(
    store: Arc<dyn StrategyStore>,
    chain: Arc<dyn ChainRpc>,
    oracle: Arc<dyn PriceOracle>,
    swap_service: Arc<dyn SwapService>,
    pair_signal: Arc<dyn PairTradeSignal>,
) -> WorkerDeps {
    let bus = TradeEventBus::new();
    let native_mint = Mint::from("So11111111111111111111111111111111111111112");
    let quote_mint = Mint::from("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

    let catalog = InMemoryTokenCatalog::new();
    catalog.seed(TokenInfo {
        mint: native_mint.clone(),
        symbol: "SOL".into(),
        decimals: 9,
        category: TokenCategory::Native,
    });
    catalog.seed(TokenInfo {
        mint: quote_mint.clone(),
        symbol: "USDC".into(),
        decimals: 6,
        category: TokenCategory::Stablecoin,
    });

    let swap = SwapDriver::new(swap_service, chain.clone(), bus.clone(), native_mint.clone(), 5_000_000);

    WorkerDeps {
        store,
        bus,
        chain,
        oracle,
        pair_signal,
        perp_venue: fixed_perp_venue(Decimal::from(100)),
        catalog: Arc::new(catalog),
        swap: Arc::new(swap),
        native_mint,
        quote_mint,
        quote_symbol: "USDC".into(),
        native_symbol: "SOL".into(),
        fee_reserve_lamports: 5_000_000,
    }
}
