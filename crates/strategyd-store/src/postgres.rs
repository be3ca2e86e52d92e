//! Postgres-backed [`StrategyStore`], queried with `sqlx`'s runtime
//! `query`/`query_as` (not the `query!` compile-time macros, which require
//! a live database at build time that this workspace never assumes).

use crate::error::StoreError;
use crate::store::{PublishedStrategy, Result, StrategyRecord, StrategyStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
// serde_json::Error has no public constructor outside of its own crate's
// de/ser paths, so custom() is the documented escape hatch for wrapping a
// foreign error as one.
use serde::de::Error as _;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Row};
use strategyd_core::{
    PerpPosition, ProfitTracking, Strategy, StrategyConfig, StrategyId, StrategyKind,
    TradeLogEntry, TradingWalletId,
};

#[derive(FromRow)]
struct StrategyRow {
    id: String,
    kind: String,
    trading_wallet_id: String,
    owner_principal: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    config: serde_json::Value,
    profit_tracking: serde_json::Value,
    public_key: String,
}

impl StrategyRow {
    fn into_record(self) -> Result<StrategyRecord> {
        let config: StrategyConfig = serde_json::from_value(self.config)?;
        let profit_tracking: ProfitTracking = serde_json::from_value(self.profit_tracking)?;
        let kind = kind_from_str(&self.kind)?;
        let strategy = Strategy {
            id: StrategyId::from(self.id),
            kind,
            trading_wallet_id: TradingWalletId::from(self.trading_wallet_id),
            owner_principal: self.owner_principal,
            is_active: self.is_active,
            created_at: self.created_at,
            last_activity: self.last_activity,
            config,
            profit_tracking,
        };
        strategy
            .check_kind_invariant()
            .map_err(|e| StoreError::Serialization(serde_json::Error::custom(e.to_string())))?;
        Ok(StrategyRecord {
            strategy,
            trading_wallet_public_key: self.public_key,
        })
    }
}

fn kind_from_str(s: &str) -> Result<StrategyKind> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(StoreError::Serialization)
}

/// A published-listing row: a [`StrategyRow`]'s columns plus the
/// `published_strategies` join.
#[derive(FromRow)]
struct PublishedRow {
    id: String,
    kind: String,
    trading_wallet_id: String,
    owner_principal: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    config: serde_json::Value,
    profit_tracking: serde_json::Value,
    public_key: String,
    headline: String,
    published_at: DateTime<Utc>,
}

impl PublishedRow {
    fn into_published(self) -> Result<PublishedStrategy> {
        let row = StrategyRow {
            id: self.id,
            kind: self.kind,
            trading_wallet_id: self.trading_wallet_id,
            owner_principal: self.owner_principal,
            is_active: self.is_active,
            created_at: self.created_at,
            last_activity: self.last_activity,
            config: self.config,
            profit_tracking: self.profit_tracking,
            public_key: self.public_key,
        };
        Ok(PublishedStrategy {
            record: row.into_record()?,
            headline: self.headline,
            published_at: self.published_at,
        })
    }
}

const SELECT_JOINED: &str = r#"
    SELECT s.id, s.kind, s.trading_wallet_id, s.owner_principal, s.is_active,
           s.created_at, s.last_activity, s.config, s.profit_tracking,
           w.public_key
    FROM strategies s
    JOIN trading_wallets w ON w.id = s.trading_wallet_id
"#;

const SELECT_PUBLISHED: &str = r#"
    SELECT s.id, s.kind, s.trading_wallet_id, s.owner_principal, s.is_active,
           s.created_at, s.last_activity, s.config, s.profit_tracking,
           w.public_key, p.headline, p.published_at
    FROM strategies s
    JOIN trading_wallets w ON w.id = s.trading_wallet_id
    JOIN published_strategies p ON p.strategy_id = s.id
"#;

pub struct PgStrategyStore {
    pool: PgPool,
}

impl PgStrategyStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, cheap to clone, for callers that need to wire
    /// another Postgres-backed component (e.g. [`crate::PgTransactionLog`])
    /// against the same connection set.
    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl StrategyStore for PgStrategyStore {
    async fn list_all(&self) -> Result<Vec<StrategyRecord>> {
        let rows: Vec<StrategyRow> = sqlx::query_as(SELECT_JOINED).fetch_all(&self.pool).await?;
        rows.into_iter().map(StrategyRow::into_record).collect()
    }

    async fn list_active(&self) -> Result<Vec<StrategyRecord>> {
        let query = format!("{SELECT_JOINED} WHERE s.is_active = TRUE");
        let rows: Vec<StrategyRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
        rows.into_iter().map(StrategyRow::into_record).collect()
    }

    async fn get(&self, id: &StrategyId) -> Result<Option<StrategyRecord>> {
        let query = format!("{SELECT_JOINED} WHERE s.id = $1");
        let row: Option<StrategyRow> = sqlx::query_as(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(StrategyRow::into_record).transpose()
    }

    /// Inserts a new strategy row against an already-registered trading
    /// wallet (§6.1) — the `trading_wallets` row is provisioned by the key
    /// escrow layer, not here, so `trading_wallet_public_key` is not
    /// re-written; it exists purely so the in-memory backend can stand on
    /// its own without a separate wallets table.
    async fn create(&self, strategy: Strategy, _trading_wallet_public_key: String) -> Result<()> {
        let config = serde_json::to_value(&strategy.config)?;
        let profit_tracking = serde_json::to_value(&strategy.profit_tracking)?;
        sqlx::query(
            "INSERT INTO strategies
                (id, kind, trading_wallet_id, owner_principal, is_active,
                 created_at, last_activity, config, profit_tracking)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(strategy.id.as_str())
        .bind(kind_as_str(strategy.kind))
        .bind(strategy.trading_wallet_id.as_str())
        .bind(&strategy.owner_principal)
        .bind(strategy.is_active)
        .bind(strategy.created_at)
        .bind(strategy.last_activity)
        .bind(config)
        .bind(profit_tracking)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_active(&self, id: &StrategyId, is_active: bool) -> Result<()> {
        let result = sqlx::query(
            "UPDATE strategies SET is_active = $1, last_activity = now() WHERE id = $2",
        )
        .bind(is_active)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn update_config(&self, id: &StrategyId, config: StrategyConfig) -> Result<()> {
        let payload = serde_json::to_value(&config)?;
        let result = sqlx::query(
            "UPDATE strategies SET config = $1, kind = $2, last_activity = now() WHERE id = $3",
        )
        .bind(payload)
        .bind(kind_as_str(config.kind()))
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn update_position(
        &self,
        id: &StrategyId,
        is_open: bool,
        position: Option<PerpPosition>,
    ) -> Result<()> {
        let row = sqlx::query("SELECT config FROM strategies WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let config_value: serde_json::Value = row.try_get("config")?;
        let mut config: StrategyConfig = serde_json::from_value(config_value)?;
        if let StrategyConfig::PerpPosition(ref mut perp) = config {
            perp.is_position_open = is_open;
            perp.current_position = position;
        }
        self.update_config(id, config).await
    }

    async fn append_trade(&self, id: &StrategyId, trade: TradeLogEntry) -> Result<()> {
        let row = sqlx::query("SELECT profit_tracking FROM strategies WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let value: serde_json::Value = row.try_get("profit_tracking")?;
        let mut profit: ProfitTracking = serde_json::from_value(value)?;
        profit.record_trade(trade);
        let payload = serde_json::to_value(&profit)?;
        sqlx::query(
            "UPDATE strategies SET profit_tracking = $1, last_activity = now() WHERE id = $2",
        )
        .bind(payload)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_published(&self) -> Result<Vec<PublishedStrategy>> {
        let rows: Vec<PublishedRow> = sqlx::query_as(SELECT_PUBLISHED).fetch_all(&self.pool).await?;
        rows.into_iter().map(PublishedRow::into_published).collect()
    }

    async fn publish(&self, id: &StrategyId, headline: String) -> Result<()> {
        // A strategy id absent from `strategies` violates the FK and
        // surfaces as a database error rather than a silent no-op.
        sqlx::query(
            "INSERT INTO published_strategies (strategy_id, headline, published_at)
             VALUES ($1, $2, now())
             ON CONFLICT (strategy_id)
             DO UPDATE SET headline = EXCLUDED.headline, published_at = EXCLUDED.published_at",
        )
        .bind(id.as_str())
        .bind(headline)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unpublish(&self, id: &StrategyId) -> Result<()> {
        sqlx::query("DELETE FROM published_strategies WHERE strategy_id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_adoption(
        &self,
        source_id: &StrategyId,
        adopted_id: &StrategyId,
        adopter_principal: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO adoptions (source_strategy_id, adopted_strategy_id, adopter_principal)
             VALUES ($1, $2, $3)",
        )
        .bind(source_id.as_str())
        .bind(adopted_id.as_str())
        .bind(adopter_principal)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn kind_as_str(kind: StrategyKind) -> &'static str {
    match kind {
        StrategyKind::PriceMonitor => "price_monitor",
        StrategyKind::WalletMonitor => "wallet_monitor",
        StrategyKind::Vault => "vault",
        StrategyKind::Levels => "levels",
        StrategyKind::PairTrade => "pair_trade",
        StrategyKind::PerpPosition => "perp_position",
    }
}
