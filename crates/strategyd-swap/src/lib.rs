//! The Swap Driver (C2 / §4.2): quote → build → sign → submit → confirm,
//! retrying under a progressive slippage ladder on a recoverable failure
//! and aborting immediately on anything else.

pub mod driver;
pub mod error;
pub mod ladder;
pub mod service;
pub mod sign;
pub mod tx_log;
pub mod types;

pub use driver::{SwapContext, SwapDriver};
pub use error::{Result, SwapError};
pub use ladder::{build_ladder, is_slippage_error, SLIPPAGE_CEILING_BPS};
pub use service::{JupiterSwapService, SwapService};
pub use tx_log::{TransactionLog, TransactionLogRow};
pub use types::{Quote, SwapRequest, SwapResult};
