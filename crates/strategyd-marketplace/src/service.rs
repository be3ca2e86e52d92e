//! The Marketplace Service (C9): a thin read/write layer over the
//! [`StrategyStore`] that lets a strategy owner publish a listing and lets
//! another principal adopt it as a fresh, inactive strategy of their own.
//!
//! Holds no state of its own — every operation round-trips through the
//! Store, which is the single source of truth for `is_active` and
//! ownership (§6.1).

use crate::error::{MarketplaceError, Result};
use std::sync::Arc;
use strategyd_core::{Strategy, StrategyConfig, StrategyId, TradingWalletId};
use strategyd_store::{PublishedStrategy, StrategyStore};
use tracing::info;

pub struct MarketplaceService {
    store: Arc<dyn StrategyStore>,
}

impl MarketplaceService {
    pub fn new(store: Arc<dyn StrategyStore>) -> Self {
        Self { store }
    }

    /// Every currently published listing, newest first is left to the
    /// caller — the Store does not guarantee an order.
    pub async fn list_published(&self) -> Result<Vec<PublishedStrategy>> {
        Ok(self.store.list_published().await?)
    }

    /// Publishes `id` under `headline`. Only the strategy's own owner may
    /// publish it; re-publishing an already-published strategy refreshes
    /// the headline.
    pub async fn publish(&self, id: &StrategyId, owner_principal: &str, headline: String) -> Result<()> {
        let record = self.require_owned(id, owner_principal).await?;
        self.store.publish(&record.strategy.id, headline).await?;
        info!(strategy_id = %id, "published strategy to marketplace");
        Ok(())
    }

    pub async fn unpublish(&self, id: &StrategyId, owner_principal: &str) -> Result<()> {
        self.require_owned(id, owner_principal).await?;
        self.store.unpublish(id).await?;
        Ok(())
    }

    /// Clones a published strategy's configuration into a new, inactive
    /// strategy row owned by `adopter_principal` against `adopter_wallet`,
    /// and records the provenance link. The adopted row always starts
    /// inactive (§2 supplement) — the adopter must explicitly activate it
    /// once they are ready to trade.
    pub async fn adopt(
        &self,
        source_id: &StrategyId,
        adopted_id: StrategyId,
        adopter_principal: &str,
        adopter_wallet: TradingWalletId,
        adopter_wallet_pubkey: String,
    ) -> Result<Strategy> {
        let published = self
            .store
            .list_published()
            .await?
            .into_iter()
            .find(|p| &p.record.strategy.id == source_id)
            .ok_or_else(|| MarketplaceError::NotPublished(source_id.clone()))?;

        let config = sanitize_for_adoption(published.record.strategy.config);
        let mut adopted = Strategy::new(
            adopted_id.clone(),
            adopter_wallet,
            adopter_principal.to_string(),
            config,
        )
        .map_err(|_| MarketplaceError::NotFound(source_id.clone()))?;
        adopted.is_active = false;

        self.store
            .create(adopted.clone(), adopter_wallet_pubkey)
            .await?;
        self.store
            .record_adoption(source_id, &adopted_id, adopter_principal)
            .await?;

        info!(source_id = %source_id, adopted_id = %adopted_id, "adopted marketplace strategy");
        Ok(adopted)
    }

    async fn require_owned(
        &self,
        id: &StrategyId,
        owner_principal: &str,
    ) -> Result<strategyd_store::StrategyRecord> {
        let record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| MarketplaceError::NotFound(id.clone()))?;
        if record.strategy.owner_principal != owner_principal {
            return Err(MarketplaceError::NotOwner(
                id.clone(),
                owner_principal.to_string(),
            ));
        }
        Ok(record)
    }
}

/// Strips run state a freshly-adopted strategy should not inherit: trade
/// history, open perp positions, and the level tracker's last-seen price.
/// The config's static parameters (targets, levels, allocations) carry
/// over unchanged.
fn sanitize_for_adoption(config: StrategyConfig) -> StrategyConfig {
    match config {
        StrategyConfig::PairTrade(mut cfg) => {
            cfg.swap_history.clear();
            cfg.last_swap_timestamp = None;
            StrategyConfig::PairTrade(cfg)
        }
        StrategyConfig::PerpPosition(mut cfg) => {
            cfg.is_position_open = false;
            cfg.current_position = None;
            StrategyConfig::PerpPosition(cfg)
        }
        StrategyConfig::Levels(mut cfg) => {
            cfg.last_price = None;
            StrategyConfig::Levels(cfg)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use strategyd_core::{PriceDirection, PriceMonitorConfig};
    use strategyd_store::InMemoryStrategyStore;

    fn sample_strategy(id: &str, owner: &str) -> Strategy {
        let config = StrategyConfig::PriceMonitor(PriceMonitorConfig {
            target_price: Decimal::from(200),
            direction: PriceDirection::Above,
            percentage_to_sell: Decimal::from(50),
        });
        Strategy::new(id.into(), "wallet-1".into(), owner.into(), config).unwrap()
    }

    #[tokio::test]
    async fn publish_requires_ownership() {
        let store = Arc::new(InMemoryStrategyStore::new());
        store
            .create(sample_strategy("s1", "alice"), "alice-pubkey".into())
            .await
            .unwrap();
        let marketplace = MarketplaceService::new(store);

        let result = marketplace
            .publish(&"s1".to_string().into(), "mallory", "steal this".into())
            .await;
        assert!(matches!(result, Err(MarketplaceError::NotOwner(_, _))));
    }

    #[tokio::test]
    async fn publish_then_list_published_round_trips() {
        let store = Arc::new(InMemoryStrategyStore::new());
        store
            .create(sample_strategy("s1", "alice"), "alice-pubkey".into())
            .await
            .unwrap();
        let marketplace = MarketplaceService::new(store);

        marketplace
            .publish(&"s1".to_string().into(), "alice", "buy the dip".into())
            .await
            .unwrap();

        let listed = marketplace.list_published().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].headline, "buy the dip");
    }

    #[tokio::test]
    async fn adopt_unpublished_strategy_fails() {
        let store = Arc::new(InMemoryStrategyStore::new());
        store
            .create(sample_strategy("s1", "alice"), "alice-pubkey".into())
            .await
            .unwrap();
        let marketplace = MarketplaceService::new(store);

        let result = marketplace
            .adopt(
                &"s1".to_string().into(),
                "s2".to_string().into(),
                "bob",
                "wallet-2".into(),
                "bob-pubkey".into(),
            )
            .await;
        assert!(matches!(result, Err(MarketplaceError::NotPublished(_))));
    }

    #[tokio::test]
    async fn adopted_strategy_starts_inactive_under_new_owner() {
        let store = Arc::new(InMemoryStrategyStore::new());
        store
            .create(sample_strategy("s1", "alice"), "alice-pubkey".into())
            .await
            .unwrap();
        let marketplace = MarketplaceService::new(store.clone());
        marketplace
            .publish(&"s1".to_string().into(), "alice", "buy the dip".into())
            .await
            .unwrap();

        let adopted = marketplace
            .adopt(
                &"s1".to_string().into(),
                "s2".to_string().into(),
                "bob",
                "wallet-2".into(),
                "bob-pubkey".into(),
            )
            .await
            .unwrap();

        assert!(!adopted.is_active);
        assert_eq!(adopted.owner_principal, "bob");

        let stored = store.get(&"s2".to_string().into()).await.unwrap().unwrap();
        assert_eq!(stored.strategy.owner_principal, "bob");
        assert!(!stored.strategy.is_active);
    }
}
