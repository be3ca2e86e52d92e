//! The [`StrategyStore`] trait (C6 / §6.1): the core's single source of
//! truth for `is_active`, strategy configuration, perp position state, and
//! the trade audit log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use strategyd_core::{PerpPosition, Strategy, StrategyConfig, StrategyId, TradeLogEntry};

pub type Result<T> = crate::error::Result<T>;

/// A strategy row joined with its trading wallet's public key, the shape
/// every worker and the Supervisor actually need — they never see the
/// wallet's secret-key reference, only the Key Escrow interface does.
#[derive(Debug, Clone)]
pub struct StrategyRecord {
    pub strategy: Strategy,
    pub trading_wallet_public_key: String,
}

/// A published strategy listing (C9): a strategy row plus the marketplace
/// metadata layered over it.
#[derive(Debug, Clone)]
pub struct PublishedStrategy {
    pub record: StrategyRecord,
    pub headline: String,
    pub published_at: DateTime<Utc>,
}

#[async_trait]
pub trait StrategyStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<StrategyRecord>>;

    async fn list_active(&self) -> Result<Vec<StrategyRecord>>;

    async fn get(&self, id: &StrategyId) -> Result<Option<StrategyRecord>>;

    /// Inserts a new strategy row against an already-registered trading
    /// wallet. Used by strategy creation and by the Marketplace's `adopt`.
    async fn create(&self, strategy: Strategy, trading_wallet_public_key: String) -> Result<()>;

    async fn update_active(&self, id: &StrategyId, is_active: bool) -> Result<()>;

    async fn update_config(&self, id: &StrategyId, config: StrategyConfig) -> Result<()>;

    /// Persists perp position state; no-op for non-perp strategies.
    async fn update_position(
        &self,
        id: &StrategyId,
        is_open: bool,
        position: Option<PerpPosition>,
    ) -> Result<()>;

    async fn append_trade(&self, id: &StrategyId, trade: TradeLogEntry) -> Result<()>;

    /// Lists every currently published strategy (C9 Marketplace browse).
    async fn list_published(&self) -> Result<Vec<PublishedStrategy>>;

    /// Marks `id` published with a display `headline`. Re-publishing an
    /// already-published strategy refreshes the headline.
    async fn publish(&self, id: &StrategyId, headline: String) -> Result<()>;

    async fn unpublish(&self, id: &StrategyId) -> Result<()>;

    /// Records that `adopter_principal` adopted `source_id` as a new row
    /// `adopted_id`, for marketplace provenance.
    async fn record_adoption(
        &self,
        source_id: &StrategyId,
        adopted_id: &StrategyId,
        adopter_principal: &str,
    ) -> Result<()>;
}
