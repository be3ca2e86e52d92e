//! Strategy identity, configuration variants, and the top-level persisted
//! `Strategy` row.

use crate::error::{CoreError, Result};
use crate::ids::{Mint, StrategyId, TradingWalletId};
use crate::levels::Level;
use crate::perp::{Direction, PerpPosition};
use crate::profit::ProfitTracking;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// The cap on vault capture percentage. §9 notes this value appears as
/// both 5 and 50 across source revisions; 50 is the operative cap.
pub const MAX_VAULT_PERCENTAGE: Decimal = dec!(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    PriceMonitor,
    WalletMonitor,
    Vault,
    Levels,
    PairTrade,
    PerpPosition,
}

impl StrategyKind {
    /// Stable lowercase label used for log fields and metric label values.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PriceMonitor => "price_monitor",
            Self::WalletMonitor => "wallet_monitor",
            Self::Vault => "vault",
            Self::Levels => "levels",
            Self::PairTrade => "pair_trade",
            Self::PerpPosition => "perp_position",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceDirection {
    Above,
    Below,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceMonitorConfig {
    pub target_price: Decimal,
    pub direction: PriceDirection,
    pub percentage_to_sell: Decimal,
}

impl PriceMonitorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.percentage_to_sell <= Decimal::ZERO || self.percentage_to_sell > Decimal::from(100) {
            return Err(CoreError::InvalidPercentage(
                "percentage_to_sell must be in (0, 100]".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletMonitorConfig {
    pub watched_wallet: String,
    pub percentage: Decimal,
}

impl WalletMonitorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.percentage <= Decimal::ZERO || self.percentage > Decimal::from(100) {
            return Err(CoreError::InvalidPercentage(
                "percentage must be in (0, 100]".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    pub vault_percentage: Decimal,
    pub main_wallet_pubkey: String,
}

impl VaultConfig {
    /// Clamps `vault_percentage` to [`MAX_VAULT_PERCENTAGE`] and rejects
    /// negative values at construction, per §8 boundary behaviors.
    pub fn new(vault_percentage: Decimal, main_wallet_pubkey: String) -> Result<Self> {
        if vault_percentage < Decimal::ZERO {
            return Err(CoreError::InvalidPercentage(
                "vault_percentage must not be negative".into(),
            ));
        }
        Ok(Self {
            vault_percentage: vault_percentage.min(MAX_VAULT_PERCENTAGE),
            main_wallet_pubkey,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelsMode {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelsConfig {
    pub mode: LevelsMode,
    pub levels: Vec<Level>,
    pub cooldown_hours: i64,
    pub max_retriggers: u32,
    pub auto_restart_after_complete: bool,
    /// Tracks the most recently observed price, used to detect level
    /// crossings (as opposed to absolute comparisons) per §4.7.
    pub last_price: Option<Decimal>,
}

impl LevelsConfig {
    /// Drops levels that fail their invariants rather than rejecting the
    /// whole strategy, per §8 boundary behaviors.
    pub fn with_validated_levels(mut self) -> Self {
        let max_retriggers = self.max_retriggers;
        self.levels = self
            .levels
            .into_iter()
            .filter_map(|l| l.validated(max_retriggers))
            .collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairToken {
    A,
    B,
}

impl PairToken {
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairSwapRecord {
    pub at: DateTime<Utc>,
    pub from: PairToken,
    pub to: PairToken,
    pub signature: String,
    pub amount_in: u64,
    pub amount_out: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairTradeConfig {
    pub token_a_mint: Mint,
    pub token_b_mint: Mint,
    pub token_a_symbol: String,
    pub token_b_symbol: String,
    pub allocation_percentage: Decimal,
    pub current_token: PairToken,
    pub max_slippage: Decimal,
    #[serde(default)]
    pub swap_history: Vec<PairSwapRecord>,
    #[serde(default)]
    pub last_swap_timestamp: Option<DateTime<Utc>>,
}

impl PairTradeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.allocation_percentage < Decimal::ONE || self.allocation_percentage > Decimal::from(100) {
            return Err(CoreError::InvalidPercentage(
                "allocation_percentage must be in [1, 100]".into(),
            ));
        }
        if self.max_slippage < dec!(0.1) || self.max_slippage > Decimal::from(10) {
            return Err(CoreError::InvalidConfig(
                "max_slippage must be in [0.1, 10] percent".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerpPositionConfig {
    pub market_index: u32,
    pub direction: Direction,
    pub allocation_percentage: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub leverage: u8,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub max_slippage: Decimal,
    #[serde(default)]
    pub is_position_open: bool,
    #[serde(default)]
    pub current_position: Option<PerpPosition>,
}

impl PerpPositionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=10).contains(&self.leverage) {
            return Err(CoreError::InvalidConfig(
                "leverage must be in [1, 10]".into(),
            ));
        }
        if self.allocation_percentage <= Decimal::ZERO || self.allocation_percentage > Decimal::from(100) {
            return Err(CoreError::InvalidPercentage(
                "allocation_percentage must be in (0, 100]".into(),
            ));
        }
        Ok(())
    }
}

/// Kind-specific configuration. The tag always agrees with the owning
/// [`Strategy`]'s `kind` field — enforced in [`Strategy::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    PriceMonitor(PriceMonitorConfig),
    WalletMonitor(WalletMonitorConfig),
    Vault(VaultConfig),
    Levels(LevelsConfig),
    PairTrade(PairTradeConfig),
    PerpPosition(PerpPositionConfig),
}

impl StrategyConfig {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::PriceMonitor(_) => StrategyKind::PriceMonitor,
            Self::WalletMonitor(_) => StrategyKind::WalletMonitor,
            Self::Vault(_) => StrategyKind::Vault,
            Self::Levels(_) => StrategyKind::Levels,
            Self::PairTrade(_) => StrategyKind::PairTrade,
            Self::PerpPosition(_) => StrategyKind::PerpPosition,
        }
    }
}

/// A persisted strategy: identity, ownership, config, and running
/// performance. See §3 of the design spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub id: StrategyId,
    pub kind: StrategyKind,
    pub trading_wallet_id: TradingWalletId,
    pub owner_principal: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub config: StrategyConfig,
    pub profit_tracking: ProfitTracking,
}

impl Strategy {
    /// Constructs a strategy, enforcing that `kind` and `config`'s variant
    /// tag agree.
    pub fn new(
        id: StrategyId,
        trading_wallet_id: TradingWalletId,
        owner_principal: String,
        config: StrategyConfig,
    ) -> Result<Self> {
        let kind = config.kind();
        let now = Utc::now();
        Ok(Self {
            id,
            kind,
            trading_wallet_id,
            owner_principal,
            is_active: true,
            created_at: now,
            last_activity: now,
            config,
            profit_tracking: ProfitTracking::default(),
        })
    }

    /// Re-validates the kind/config tag agreement — called after
    /// deserializing a row loaded from the Store, since storage round-trips
    /// are the one place this invariant could silently drift.
    pub fn check_kind_invariant(&self) -> Result<()> {
        if self.config.kind() != self.kind {
            return Err(CoreError::KindConfigMismatch);
        }
        Ok(())
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}
