//! One module per strategy kind (§4.4-§4.9), each implementing [`crate::worker::Worker`].

pub mod pair_trade;
pub mod perp_position;
pub mod price_monitor;
pub mod vault;
pub mod wallet_monitor;

pub mod levels;

pub use pair_trade::PairTradeWorker;
pub use perp_position::PerpPositionWorker;
pub use price_monitor::PriceMonitorWorker;
pub use vault::VaultWorker;
pub use wallet_monitor::WalletMonitorWorker;

pub use levels::LevelsWorker;
