//! The [`PriceOracle`] trait (C3 / §6.3): spot price lookups in quote
//! currency, by symbol.

use async_trait::async_trait;

pub type Result<T> = crate::error::Result<T>;

#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Spot price of `symbol` in quote currency (commonly USDC).
    async fn price(&self, symbol: &str) -> Result<f64>;
}
