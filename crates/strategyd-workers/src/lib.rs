//! The six strategy workers (C7) and the [`Worker`] capability they share.
//!
//! Each module under [`workers`] owns one [`strategyd_core::StrategyKind`]'s
//! runtime behavior. The Supervisor (a separate crate) constructs workers
//! from [`context::WorkerDeps`] and a decrypted [`escrow::KeyEscrow`] key,
//! then holds them as homogeneous [`worker::WorkerHandle`]s.

pub mod context;
pub mod error;
pub mod escrow;
pub mod factory;
pub mod perp_venue;
pub mod worker;
pub mod workers;

#[cfg(test)]
mod test_support;

pub use context::WorkerDeps;
pub use error::WorkerError;
pub use escrow::{EscrowError, HttpKeyEscrow, KeyEscrow};
pub use factory::build_worker;
pub use perp_venue::{HttpPerpVenue, OpenPositionRequest, PerpVenue, PerpVenueError};
pub use worker::{sleep_or_cancelled, spawn, Worker, WorkerHandle};
pub use workers::{
    LevelsWorker, PairTradeWorker, PerpPositionWorker, PriceMonitorWorker, VaultWorker,
    WalletMonitorWorker,
};
