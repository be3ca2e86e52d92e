//! An in-memory [`StrategyStore`], used by worker and supervisor tests
//! elsewhere in the workspace so they don't need a live Postgres instance.

use crate::error::StoreError;
use crate::store::{PublishedStrategy, Result, StrategyRecord, StrategyStore};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use strategyd_core::{PerpPosition, Strategy, StrategyConfig, StrategyId, TradeLogEntry};

pub struct InMemoryStrategyStore {
    rows: DashMap<String, StrategyRecord>,
    published: DashMap<String, (String, chrono::DateTime<Utc>)>,
}

impl InMemoryStrategyStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            published: DashMap::new(),
        }
    }

    pub fn insert(&self, record: StrategyRecord) {
        self.rows.insert(record.strategy.id.to_string(), record);
    }

    /// Removes a row outright, e.g. to simulate a strategy deleted out from
    /// under a running Supervisor in tests.
    pub fn remove(&self, id: &StrategyId) -> Option<StrategyRecord> {
        self.rows.remove(id.as_str()).map(|(_, v)| v)
    }
}

impl Default for InMemoryStrategyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StrategyStore for InMemoryStrategyStore {
    async fn list_all(&self) -> Result<Vec<StrategyRecord>> {
        Ok(self.rows.iter().map(|e| e.value().clone()).collect())
    }

    async fn list_active(&self) -> Result<Vec<StrategyRecord>> {
        Ok(self
            .rows
            .iter()
            .filter(|e| e.value().strategy.is_active)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn get(&self, id: &StrategyId) -> Result<Option<StrategyRecord>> {
        Ok(self.rows.get(id.as_str()).map(|e| e.value().clone()))
    }

    async fn create(&self, strategy: Strategy, trading_wallet_public_key: String) -> Result<()> {
        self.rows.insert(
            strategy.id.to_string(),
            StrategyRecord {
                strategy,
                trading_wallet_public_key,
            },
        );
        Ok(())
    }

    async fn update_active(&self, id: &StrategyId, is_active: bool) -> Result<()> {
        let mut entry = self
            .rows
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        entry.strategy.is_active = is_active;
        entry.strategy.touch();
        Ok(())
    }

    async fn update_config(&self, id: &StrategyId, config: StrategyConfig) -> Result<()> {
        let mut entry = self
            .rows
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        entry.strategy.kind = config.kind();
        entry.strategy.config = config;
        entry.strategy.touch();
        Ok(())
    }

    async fn update_position(
        &self,
        id: &StrategyId,
        is_open: bool,
        position: Option<PerpPosition>,
    ) -> Result<()> {
        let mut entry = self
            .rows
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if let StrategyConfig::PerpPosition(ref mut perp) = entry.strategy.config {
            perp.is_position_open = is_open;
            perp.current_position = position;
        }
        entry.strategy.touch();
        Ok(())
    }

    async fn append_trade(&self, id: &StrategyId, trade: TradeLogEntry) -> Result<()> {
        let mut entry = self
            .rows
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        entry.strategy.profit_tracking.record_trade(trade);
        entry.strategy.touch();
        Ok(())
    }

    async fn list_published(&self) -> Result<Vec<PublishedStrategy>> {
        Ok(self
            .published
            .iter()
            .filter_map(|e| {
                let record = self.rows.get(e.key())?.value().clone();
                let (headline, published_at) = e.value().clone();
                Some(PublishedStrategy {
                    record,
                    headline,
                    published_at,
                })
            })
            .collect())
    }

    async fn publish(&self, id: &StrategyId, headline: String) -> Result<()> {
        if !self.rows.contains_key(id.as_str()) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.published.insert(id.to_string(), (headline, Utc::now()));
        Ok(())
    }

    async fn unpublish(&self, id: &StrategyId) -> Result<()> {
        self.published.remove(id.as_str());
        Ok(())
    }

    async fn record_adoption(
        &self,
        _source_id: &StrategyId,
        _adopted_id: &StrategyId,
        _adopter_principal: &str,
    ) -> Result<()> {
        // In-memory store keeps no adoption history; the Postgres backend
        // persists one row per adoption for provenance queries.
        Ok(())
    }
}
