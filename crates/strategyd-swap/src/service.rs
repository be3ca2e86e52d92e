//! The [`SwapService`] trait (§6.2): an external quote/build service. The
//! driver never signs or submits through this trait — it only requests a
//! route and a serialized, unsigned transaction.

use crate::error::SwapError;
use crate::types::Quote;
use async_trait::async_trait;
use strategyd_core::Mint;

pub type Result<T> = crate::error::Result<T>;

#[async_trait]
pub trait SwapService: Send + Sync {
    async fn quote(
        &self,
        input_mint: &Mint,
        output_mint: &Mint,
        amount: u64,
        slippage_bps: u16,
        platform_fee_bps: Option<u16>,
    ) -> Result<Quote>;

    /// Returns a base64-encoded, unsigned serialized transaction.
    async fn build_swap(
        &self,
        quote: &Quote,
        user_pubkey: &str,
        fee_account: Option<&str>,
    ) -> Result<String>;
}

mod jupiter {
    use super::*;
    use reqwest::Client;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;
    use tracing::debug;

    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    #[derive(Debug, Deserialize)]
    struct QuoteResponse {
        #[serde(rename = "inAmount")]
        in_amount: String,
        #[serde(rename = "outAmount")]
        out_amount: String,
        #[serde(rename = "slippageBps")]
        slippage_bps: u16,
        #[serde(rename = "routePlan")]
        route_plan: serde_json::Value,
    }

    #[derive(Debug, Serialize)]
    struct SwapBuildRequest<'a> {
        #[serde(rename = "quoteResponse")]
        quote_response: &'a serde_json::Value,
        #[serde(rename = "userPublicKey")]
        user_public_key: &'a str,
        #[serde(rename = "feeAccount", skip_serializing_if = "Option::is_none")]
        fee_account: Option<&'a str>,
    }

    #[derive(Debug, Deserialize)]
    struct SwapBuildResponse {
        #[serde(rename = "swapTransaction")]
        swap_transaction: String,
    }

    /// Talks to a Jupiter-compatible aggregator's `/quote` and `/swap`
    /// endpoints.
    pub struct JupiterSwapService {
        client: Client,
        base_url: String,
    }

    impl JupiterSwapService {
        pub fn new(base_url: impl Into<String>) -> Result<Self> {
            let client = Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .map_err(|e| SwapError::Quote(format!("failed to build HTTP client: {e}")))?;
            Ok(Self {
                client,
                base_url: base_url.into(),
            })
        }
    }

    #[async_trait]
    impl SwapService for JupiterSwapService {
        async fn quote(
            &self,
            input_mint: &Mint,
            output_mint: &Mint,
            amount: u64,
            slippage_bps: u16,
            platform_fee_bps: Option<u16>,
        ) -> Result<Quote> {
            let url = format!("{}/quote", self.base_url.trim_end_matches('/'));
            debug!(%input_mint, %output_mint, amount, slippage_bps, "requesting swap quote");

            let mut query = vec![
                ("inputMint", input_mint.as_str().to_string()),
                ("outputMint", output_mint.as_str().to_string()),
                ("amount", amount.to_string()),
                ("slippageBps", slippage_bps.to_string()),
            ];
            if let Some(bps) = platform_fee_bps {
                query.push(("platformFeeBps", bps.to_string()));
            }

            let response = self
                .client
                .get(&url)
                .query(&query)
                .send()
                .await
                .map_err(|e| SwapError::Quote(e.to_string()))?;

            if !response.status().is_success() {
                return Err(SwapError::Quote(format!(
                    "unexpected status {}",
                    response.status()
                )));
            }

            let parsed: QuoteResponse = response
                .json()
                .await
                .map_err(|e| SwapError::Quote(e.to_string()))?;

            Ok(Quote {
                in_amount: parsed
                    .in_amount
                    .parse()
                    .map_err(|_| SwapError::Quote("malformed inAmount".into()))?,
                out_amount: parsed
                    .out_amount
                    .parse()
                    .map_err(|_| SwapError::Quote("malformed outAmount".into()))?,
                slippage_bps: parsed.slippage_bps,
                route_plan: parsed.route_plan,
            })
        }

        async fn build_swap(
            &self,
            quote: &Quote,
            user_pubkey: &str,
            fee_account: Option<&str>,
        ) -> Result<String> {
            let url = format!("{}/swap", self.base_url.trim_end_matches('/'));
            let body = SwapBuildRequest {
                quote_response: &quote.route_plan,
                user_public_key: user_pubkey,
                fee_account,
            };

            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| SwapError::Build(e.to_string()))?;

            if !response.status().is_success() {
                return Err(SwapError::Build(format!(
                    "unexpected status {}",
                    response.status()
                )));
            }

            let parsed: SwapBuildResponse = response
                .json()
                .await
                .map_err(|e| SwapError::Build(e.to_string()))?;
            Ok(parsed.swap_transaction)
        }
    }
}

pub use jupiter::JupiterSwapService;
