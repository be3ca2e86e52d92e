//! In-memory catalog: a seeded set of known tokens plus a TTL-bounded cache
//! for entries discovered afterward (e.g. fetched from an external token
//! list on first lookup). Only the seed is populated here; override entries
//! age out after their TTL and are treated as unknown again, forcing a
//! fresh lookup upstream.

use crate::catalog::{Result, TokenCatalog, TokenCategory, TokenInfo};
use crate::error::CatalogError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use strategyd_core::Mint;

struct CachedEntry {
    info: TokenInfo,
    inserted_at: Instant,
}

pub struct InMemoryTokenCatalog {
    seed: DashMap<String, TokenInfo>,
    overrides: DashMap<String, CachedEntry>,
    override_ttl: Duration,
}

impl InMemoryTokenCatalog {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(3600))
    }

    pub fn with_ttl(override_ttl: Duration) -> Self {
        Self {
            seed: DashMap::new(),
            overrides: DashMap::new(),
            override_ttl,
        }
    }

    pub fn seed(&self, info: TokenInfo) {
        self.seed.insert(info.mint.as_str().to_string(), info);
    }

    /// Registers a token discovered at runtime; expires after the
    /// configured TTL.
    pub fn insert_override(&self, info: TokenInfo) {
        self.overrides.insert(
            info.mint.as_str().to_string(),
            CachedEntry {
                info,
                inserted_at: Instant::now(),
            },
        );
    }

    fn lookup(&self, mint: &Mint) -> Option<TokenInfo> {
        if let Some(entry) = self.seed.get(mint.as_str()) {
            return Some(entry.clone());
        }
        if let Some(entry) = self.overrides.get(mint.as_str()) {
            if entry.inserted_at.elapsed() < self.override_ttl {
                return Some(entry.info.clone());
            }
        }
        None
    }
}

impl Default for InMemoryTokenCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenCatalog for InMemoryTokenCatalog {
    async fn token_info(&self, mint: &Mint) -> Result<TokenInfo> {
        self.lookup(mint)
            .ok_or_else(|| CatalogError::UnknownToken(mint.clone()))
    }

    async fn validate_pair(&self, a: &Mint, b: &Mint) -> Result<()> {
        if a == b {
            return Err(CatalogError::IneligiblePair(
                "pair tokens must be distinct".into(),
            ));
        }
        let info_a = self.token_info(a).await?;
        let info_b = self.token_info(b).await?;
        if info_a.category == TokenCategory::RiskRestricted
            || info_b.category == TokenCategory::RiskRestricted
        {
            return Err(CatalogError::IneligiblePair(
                "risk-restricted tokens cannot be paired".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(mint: &str, category: TokenCategory) -> TokenInfo {
        TokenInfo {
            mint: Mint::from(mint),
            symbol: mint.to_string(),
            decimals: 6,
            category,
        }
    }

    #[tokio::test]
    async fn unknown_token_errors() {
        let catalog = InMemoryTokenCatalog::new();
        let result = catalog.token_info(&Mint::from("missing")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn identical_mints_rejected() {
        let catalog = InMemoryTokenCatalog::new();
        catalog.seed(token("SOL", TokenCategory::Native));
        let result = catalog
            .validate_pair(&Mint::from("SOL"), &Mint::from("SOL"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn risk_restricted_token_rejected() {
        let catalog = InMemoryTokenCatalog::new();
        catalog.seed(token("SOL", TokenCategory::Native));
        catalog.seed(token("RISKY", TokenCategory::RiskRestricted));
        let result = catalog
            .validate_pair(&Mint::from("SOL"), &Mint::from("RISKY"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn eligible_pair_passes() {
        let catalog = InMemoryTokenCatalog::new();
        catalog.seed(token("SOL", TokenCategory::Native));
        catalog.seed(token("USDC", TokenCategory::Stablecoin));
        let result = catalog
            .validate_pair(&Mint::from("SOL"), &Mint::from("USDC"))
            .await;
        assert!(result.is_ok());
    }
}
