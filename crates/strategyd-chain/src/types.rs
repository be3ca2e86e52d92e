//! Wire-adjacent types returned by [`crate::ChainRpc`].

use std::sync::Arc;

/// A parsed on-chain account, trimmed to the fields workers actually need.
#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub owner: String,
    pub lamports: u64,
    pub data: Vec<u8>,
    pub executable: bool,
}

/// Outcome of awaiting a submitted transaction's confirmation.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub confirmed: bool,
    pub slot: Option<u64>,
    pub err: Option<String>,
}

/// One entry delivered to an `on_logs` subscriber.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub signature: String,
    pub logs: Vec<String>,
    pub err: Option<String>,
}

/// The token-balance delta an owner experienced in one confirmed
/// transaction, for the mint whose balance decreased the most — i.e. the
/// token a watched wallet sold in a swap. Used by WalletMonitor (§4.5) to
/// size a proportional mirror trade without needing a full transaction
/// parser.
#[derive(Debug, Clone)]
pub struct ObservedSwap {
    pub sold_mint: String,
    pub pre_balance: u64,
    pub amount_sold: u64,
}

pub type LogsCallback = Arc<dyn Fn(LogEvent) + Send + Sync>;

/// Opaque handle returned by `on_logs`, passed back to `remove_on_logs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogsSubscriptionId(pub(crate) u64);

impl LogsSubscriptionId {
    /// Constructs a handle from a raw id. Exposed for fake `ChainRpc`
    /// implementations in other crates' test suites.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }
}
