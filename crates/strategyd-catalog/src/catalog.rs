//! The [`TokenCatalog`] trait (C5): token metadata lookups and
//! pair-eligibility validation, gating strategy admission for PairTrade and
//! Levels configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strategyd_core::Mint;

pub type Result<T> = crate::error::Result<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenCategory {
    Native,
    Stablecoin,
    Standard,
    RiskRestricted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub mint: Mint,
    pub symbol: String,
    pub decimals: u8,
    pub category: TokenCategory,
}

#[async_trait]
pub trait TokenCatalog: Send + Sync {
    async fn token_info(&self, mint: &Mint) -> Result<TokenInfo>;

    /// Validates that two mints are distinct and neither is risk-restricted.
    async fn validate_pair(&self, a: &Mint, b: &Mint) -> Result<()>;
}
