//! Core domain types shared across the strategy trading daemon.

pub mod error;
pub mod events;
pub mod ids;
pub mod levels;
pub mod perp;
pub mod profit;
pub mod strategy;
pub mod wallet;

pub use error::{CoreError, Result};
pub use events::TradeSuccessEvent;
pub use ids::{Mint, StrategyId, TradingWalletId};
pub use levels::{Level, LevelExecution, LevelKind};
pub use perp::{Direction, PerpPosition};
pub use profit::{DailyPerformance, ProfitTracking, TradeLogEntry};
pub use strategy::{
    LevelsConfig, LevelsMode, PairSwapRecord, PairToken, PairTradeConfig, PerpPositionConfig,
    PriceDirection, PriceMonitorConfig, Strategy, StrategyConfig, StrategyKind, VaultConfig,
    WalletMonitorConfig, MAX_VAULT_PERCENTAGE,
};
pub use wallet::TradingWallet;
