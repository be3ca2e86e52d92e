//! The Strategy Store (C6 / §6.1): CRUD over persisted strategies, their
//! trading-wallet join, perp position state, and the trade audit log.
//!
//! [`PgStrategyStore`] is the production backend; [`InMemoryStrategyStore`]
//! backs tests elsewhere in the workspace without a live database.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod tx_log;

pub use error::StoreError;
pub use memory::InMemoryStrategyStore;
pub use postgres::PgStrategyStore;
pub use store::{PublishedStrategy, StrategyRecord, StrategyStore};
pub use tx_log::{NoopTransactionLog, PgTransactionLog};
