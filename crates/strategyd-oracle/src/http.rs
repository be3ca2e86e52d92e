//! HTTP-backed price oracle.

use crate::error::OracleError;
use crate::oracle::{PriceOracle, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct PriceResponse {
    price: f64,
}

/// Fetches spot prices from a REST price feed that answers
/// `GET {base_url}/price?symbol={symbol}` with `{"price": <f64>}`.
pub struct HttpPriceOracle {
    client: Client,
    base_url: String,
}

impl HttpPriceOracle {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| OracleError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn price(&self, symbol: &str) -> Result<f64> {
        let url = format!("{}/price", self.base_url.trim_end_matches('/'));
        debug!(symbol, %url, "fetching spot price");

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .map_err(|e| OracleError::Request(e.to_string()))?;

        if !response.status().is_success() {
            if response.status().as_u16() == 404 {
                return Err(OracleError::UnknownSymbol(symbol.to_string()));
            }
            return Err(OracleError::Request(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let parsed: PriceResponse = response
            .json()
            .await
            .map_err(|e| OracleError::MalformedResponse(e.to_string()))?;
        Ok(parsed.price)
    }
}
