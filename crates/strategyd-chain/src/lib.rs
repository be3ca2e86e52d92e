//! Chain RPC access (C4 / §6.5): native and token balance reads, account
//! lookups, transaction submission/confirmation, and account-level log
//! subscriptions, behind the [`ChainRpc`] trait so workers and tests never
//! depend on the Solana SDK directly.

pub mod error;
pub mod rpc;
pub mod solana;
pub mod types;

pub use error::{ChainError, Result};
pub use rpc::{BalanceReader, ChainRpc};
pub use solana::SolanaChainRpc;
pub use types::{AccountInfo, Confirmation, LogEvent, LogsCallback, LogsSubscriptionId, ObservedSwap};
