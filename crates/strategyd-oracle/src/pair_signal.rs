//! External pair-trade trigger signal (§4.8): a small binary recommendation
//! a dislocation-style detector publishes for a trading pair, consulted by
//! the PairTrade worker instead of computing its own edge.

use crate::error::OracleError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use strategyd_core::PairToken;
use tracing::debug;

pub type Result<T> = crate::error::Result<T>;

/// The externally published state of one pair's trigger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairTrigger {
    /// `true` when the detector currently recommends flipping.
    pub trigger_swap: bool,
    /// Which side of the pair the detector currently favors holding.
    pub current_direction: PairToken,
}

#[async_trait]
pub trait PairTradeSignal: Send + Sync {
    /// Fetches the current trigger row for `pair_key` (conventionally
    /// `"{token_a_symbol}/{token_b_symbol}"`).
    async fn trigger(&self, pair_key: &str) -> Result<PairTrigger>;

    /// The side a brand-new PairTrade strategy should start holding, used
    /// once on first start when `swap_history` is empty.
    async fn preferred_initial_token(&self, pair_key: &str) -> Result<PairToken>;
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct TriggerResponse {
    trigger_swap: bool,
    current_direction: String,
    preferred_initial_token: String,
}

fn parse_token(raw: &str) -> Result<PairToken> {
    match raw {
        "a" | "A" => Ok(PairToken::A),
        "b" | "B" => Ok(PairToken::B),
        other => Err(OracleError::MalformedResponse(format!(
            "unknown pair token {other}"
        ))),
    }
}

/// Fetches trigger rows from a REST detector that answers
/// `GET {base_url}/trigger?pair={pair_key}`.
pub struct HttpPairSignalSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPairSignalSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| OracleError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn fetch(&self, pair_key: &str) -> Result<TriggerResponse> {
        let url = format!("{}/trigger", self.base_url.trim_end_matches('/'));
        debug!(pair_key, %url, "fetching pair trigger row");

        let response = self
            .client
            .get(&url)
            .query(&[("pair", pair_key)])
            .send()
            .await
            .map_err(|e| OracleError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OracleError::Request(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OracleError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl PairTradeSignal for HttpPairSignalSource {
    async fn trigger(&self, pair_key: &str) -> Result<PairTrigger> {
        let parsed = self.fetch(pair_key).await?;
        Ok(PairTrigger {
            trigger_swap: parsed.trigger_swap,
            current_direction: parse_token(&parsed.current_direction)?,
        })
    }

    async fn preferred_initial_token(&self, pair_key: &str) -> Result<PairToken> {
        let parsed = self.fetch(pair_key).await?;
        parse_token(&parsed.preferred_initial_token)
    }
}
