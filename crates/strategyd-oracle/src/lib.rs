//! Price Oracle Client (C3 / §6.3): spot price lookups for a symbol, with
//! an optional 1-hour TTL cache layered on top.

pub mod caching;
pub mod error;
pub mod http;
pub mod oracle;
pub mod pair_signal;

pub use caching::CachingPriceOracle;
pub use error::{OracleError, Result};
pub use http::HttpPriceOracle;
pub use oracle::PriceOracle;
pub use pair_signal::{HttpPairSignalSource, PairTradeSignal, PairTrigger};
