//! Application configuration, loaded from a TOML file and validated once
//! at startup — the same place and style the teacher validates its own
//! `AppConfig` (load, then reject anything out of range before wiring
//! begins).

use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_fee_reserve_lamports() -> u64 {
    5_000_000
}

fn default_oracle_cache_ttl_secs() -> u64 {
    0
}

/// Strategy Store backend selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", tag = "backend")]
pub enum StoreConfig {
    /// Backed by Postgres via `sqlx`; `database_url` is a standard
    /// `postgres://` connection string.
    Postgres { database_url: String },
    /// In-process only, for local runs and smoke tests. Strategies do not
    /// survive a restart.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub ws_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    pub base_url: String,
    /// TTL in seconds for the caching decorator. `0` disables caching.
    #[serde(default = "default_oracle_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PairSignalConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EscrowConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwapConfig {
    pub base_url: String,
    #[serde(default = "default_fee_reserve_lamports")]
    pub fee_reserve_lamports: u64,
    /// §9 Open Question: kept as a config field rather than a constant,
    /// since the platform fee account is an operator-controlled token
    /// account, not a protocol invariant.
    #[serde(default)]
    pub platform_fee_account: Option<String>,
    #[serde(default)]
    pub platform_fee_bps: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerpVenueConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenSeedConfig {
    pub mint: String,
    pub symbol: String,
    pub decimals: u8,
    pub category: strategyd_catalog::TokenCategory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub chain: ChainConfig,
    pub oracle: OracleConfig,
    pub pair_signal: PairSignalConfig,
    pub escrow: EscrowConfig,
    pub swap: SwapConfig,
    pub perp_venue: PerpVenueConfig,
    /// Known tokens, seeded into the in-memory catalog at startup (§6
    /// "static catalog").
    pub catalog: Vec<TokenSeedConfig>,
    pub native_mint: String,
    pub native_symbol: String,
    pub quote_mint: String,
    pub quote_symbol: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl AppConfig {
    /// Loads from a specific file path.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("failed to read config {path}: {e}")))?;
        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("failed to parse config {path}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves the config path from an explicit override, else
    /// `STRATEGYD_CONFIG`, else `config/strategyd.toml`.
    pub fn load(explicit_path: Option<String>) -> AppResult<Self> {
        let path = explicit_path
            .or_else(|| std::env::var("STRATEGYD_CONFIG").ok())
            .unwrap_or_else(|| "config/strategyd.toml".to_string());

        if !Path::new(&path).exists() {
            return Err(AppError::Config(format!("config file not found: {path}")));
        }
        Self::from_file(&path)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    fn validate(&self) -> AppResult<()> {
        if self.poll_interval_secs == 0 {
            return Err(AppError::Config("poll_interval_secs must be positive".into()));
        }
        if self.swap.fee_reserve_lamports == 0 {
            return Err(AppError::Config(
                "swap.fee_reserve_lamports must be positive".into(),
            ));
        }
        if let Some(bps) = self.swap.platform_fee_bps {
            if bps > 10_000 {
                return Err(AppError::Config(
                    "swap.platform_fee_bps must be in [0, 10000]".into(),
                ));
            }
        }
        if self.native_mint == self.quote_mint {
            return Err(AppError::Config(
                "native_mint and quote_mint must be distinct".into(),
            ));
        }
        if self.catalog.is_empty() {
            return Err(AppError::Config(
                "catalog must seed at least the native and quote tokens".into(),
            ));
        }
        let mints: std::collections::HashSet<&str> =
            self.catalog.iter().map(|t| t.mint.as_str()).collect();
        if !mints.contains(self.native_mint.as_str()) || !mints.contains(self.quote_mint.as_str()) {
            return Err(AppError::Config(
                "catalog must include entries for native_mint and quote_mint".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
            native_mint = "So11111111111111111111111111111111111111112"
            native_symbol = "SOL"
            quote_mint = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
            quote_symbol = "USDC"

            [store]
            backend = "memory"

            [chain]
            rpc_url = "https://rpc.example.com"
            ws_url = "wss://rpc.example.com"

            [oracle]
            base_url = "https://oracle.example.com"

            [pair_signal]
            base_url = "https://signal.example.com"

            [escrow]
            base_url = "https://escrow.example.com"

            [swap]
            base_url = "https://jupiter.example.com"

            [perp_venue]
            base_url = "https://perp.example.com"

            [[catalog]]
            mint = "So11111111111111111111111111111111111111112"
            symbol = "SOL"
            decimals = 9
            category = "native"

            [[catalog]]
            mint = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
            symbol = "USDC"
            decimals = 6
            category = "stablecoin"
        "#
    }

    #[test]
    fn parses_and_validates_minimal_config() {
        let config: AppConfig = toml::from_str(sample_toml()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.swap.fee_reserve_lamports, 5_000_000);
    }

    #[test]
    fn rejects_identical_native_and_quote_mints() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.quote_mint = config.native_mint.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_platform_fee_bps_out_of_range() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.swap.platform_fee_bps = Some(20_000);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_catalog_missing_native_mint() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.catalog.retain(|t| t.symbol != "SOL");
        assert!(config.validate().is_err());
    }
}
