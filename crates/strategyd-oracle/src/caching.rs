//! Optional read-through cache with a 1-hour TTL per symbol, per §5's
//! "optional cache with a 1-hour TTL keyed by token set" for read-only
//! oracle/catalog data.

use crate::oracle::{PriceOracle, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

const DEFAULT_TTL: Duration = Duration::from_secs(3600);

struct CachedPrice {
    value: f64,
    fetched_at: Instant,
}

/// Wraps any [`PriceOracle`] with an in-memory TTL cache, keyed by symbol.
pub struct CachingPriceOracle<O: PriceOracle> {
    inner: O,
    ttl: Duration,
    cache: DashMap<String, CachedPrice>,
}

impl<O: PriceOracle> CachingPriceOracle<O> {
    pub fn new(inner: O) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL)
    }

    pub fn with_ttl(inner: O, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: DashMap::new(),
        }
    }
}

#[async_trait]
impl<O: PriceOracle> PriceOracle for CachingPriceOracle<O> {
    async fn price(&self, symbol: &str) -> Result<f64> {
        if let Some(entry) = self.cache.get(symbol) {
            if entry.fetched_at.elapsed() < self.ttl {
                return Ok(entry.value);
            }
        }

        let value = self.inner.price(symbol).await?;
        self.cache.insert(
            symbol.to_string(),
            CachedPrice {
                value,
                fetched_at: Instant::now(),
            },
        );
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingOracle {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PriceOracle for CountingOracle {
        async fn price(&self, _symbol: &str) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(1.23)
        }
    }

    #[tokio::test]
    async fn repeated_lookups_within_ttl_hit_cache() {
        let oracle = CachingPriceOracle::with_ttl(
            CountingOracle {
                calls: AtomicUsize::new(0),
            },
            Duration::from_secs(3600),
        );

        assert_eq!(oracle.price("SOL").await.unwrap(), 1.23);
        assert_eq!(oracle.price("SOL").await.unwrap(), 1.23);
        assert_eq!(oracle.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_refetches() {
        let oracle = CachingPriceOracle::with_ttl(
            CountingOracle {
                calls: AtomicUsize::new(0),
            },
            Duration::from_millis(1),
        );

        oracle.price("SOL").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        oracle.price("SOL").await.unwrap();

        assert_eq!(oracle.inner.calls.load(Ordering::SeqCst), 2);
    }
}
