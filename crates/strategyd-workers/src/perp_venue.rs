//! The perpetual futures venue (§4.9): mark price, position state, and
//! order placement for the PerpPosition worker. Modeled as its own small
//! trait rather than folded into [`strategyd_chain::ChainRpc`] since a perp
//! venue (e.g. a Drift-style program) has its own account layout and order
//! lifecycle distinct from spot balance/transfer RPCs.

use async_trait::async_trait;
use rust_decimal::Decimal;
use solana_sdk::signature::Keypair;
use std::sync::Arc;
use strategyd_core::{Direction, PerpPosition};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PerpVenueError>;

#[derive(Debug, Error)]
pub enum PerpVenueError {
    #[error("venue request failed: {0}")]
    Request(String),
    #[error("no open position to close")]
    NoOpenPosition,
}

pub struct OpenPositionRequest {
    pub market_index: u32,
    pub direction: Direction,
    pub base_qty: Decimal,
    pub leverage: u8,
    pub max_slippage: Decimal,
    pub wallet_keypair: Arc<Keypair>,
}

#[async_trait]
pub trait PerpVenue: Send + Sync {
    async fn mark_price(&self, market_index: u32) -> Result<Decimal>;

    /// Current on-venue position for `owner`, authoritative over any
    /// locally cached state.
    async fn position(&self, market_index: u32, owner: &str) -> Result<Option<PerpPosition>>;

    /// Total deposited collateral for `owner`, across all markets.
    async fn total_collateral(&self, owner: &str) -> Result<Decimal>;

    /// Free (unused) collateral available to size a new position.
    async fn free_collateral(&self, owner: &str) -> Result<Decimal>;

    async fn deposit_collateral(
        &self,
        owner: &str,
        amount: Decimal,
        wallet_keypair: Arc<Keypair>,
    ) -> Result<String>;

    async fn open_position(&self, request: OpenPositionRequest) -> Result<PerpPosition>;

    async fn close_position(
        &self,
        market_index: u32,
        owner: &str,
        wallet_keypair: Arc<Keypair>,
    ) -> Result<String>;
}

mod http {
    use super::*;
    use reqwest::Client;
    use serde::{Deserialize, Serialize};
    use solana_sdk::signature::Signer;
    use std::time::Duration;
    use strategyd_chain::ChainRpc;
    use tracing::debug;

    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    #[derive(Debug, Deserialize)]
    struct MarkPriceResponse {
        price: Decimal,
    }

    #[derive(Debug, Deserialize)]
    struct PositionResponse {
        position: Option<PerpPosition>,
    }

    #[derive(Debug, Deserialize)]
    struct CollateralResponse {
        total: Decimal,
        free: Decimal,
    }

    #[derive(Debug, Serialize)]
    struct DepositRequest<'a> {
        owner: &'a str,
        amount: Decimal,
    }

    #[derive(Debug, Serialize)]
    struct OpenPositionBody<'a> {
        market_index: u32,
        direction: Direction,
        base_qty: Decimal,
        leverage: u8,
        max_slippage: Decimal,
        owner: &'a str,
    }

    #[derive(Debug, Deserialize)]
    struct OpenPositionResponse {
        #[serde(rename = "unsignedTransaction")]
        unsigned_transaction: String,
        position: PerpPosition,
    }

    #[derive(Debug, Deserialize)]
    struct UnsignedTxResponse {
        #[serde(rename = "unsignedTransaction")]
        unsigned_transaction: String,
    }

    /// Talks to a Drift-style perp venue's REST surface for reads, and
    /// signs/submits the unsigned transactions it returns for state
    /// changes, matching the Swap Driver's own sign-then-submit split
    /// (§4.2) rather than trusting the venue to hold key material.
    pub struct HttpPerpVenue {
        client: Client,
        base_url: String,
        chain: Arc<dyn ChainRpc>,
    }

    impl HttpPerpVenue {
        pub fn new(base_url: impl Into<String>, chain: Arc<dyn ChainRpc>) -> Result<Self> {
            let client = Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .map_err(|e| PerpVenueError::Request(e.to_string()))?;
            Ok(Self {
                client,
                base_url: base_url.into(),
                chain,
            })
        }

        async fn sign_submit_confirm(
            &self,
            unsigned_tx: &str,
            wallet_keypair: &Keypair,
        ) -> Result<String> {
            let signed = strategyd_swap::sign::sign_transaction(unsigned_tx, wallet_keypair)
                .map_err(PerpVenueError::Request)?;
            let signature = self
                .chain
                .submit_transaction(&signed)
                .await
                .map_err(|e| PerpVenueError::Request(e.to_string()))?;
            self.chain
                .confirm_transaction(&signature)
                .await
                .map_err(|e| PerpVenueError::Request(e.to_string()))?;
            Ok(signature)
        }
    }

    #[async_trait]
    impl PerpVenue for HttpPerpVenue {
        async fn mark_price(&self, market_index: u32) -> Result<Decimal> {
            let url = format!("{}/mark-price", self.base_url.trim_end_matches('/'));
            debug!(market_index, %url, "fetching perp mark price");
            let response: MarkPriceResponse = self
                .client
                .get(&url)
                .query(&[("market_index", market_index)])
                .send()
                .await
                .map_err(|e| PerpVenueError::Request(e.to_string()))?
                .json()
                .await
                .map_err(|e| PerpVenueError::Request(e.to_string()))?;
            Ok(response.price)
        }

        async fn position(&self, market_index: u32, owner: &str) -> Result<Option<PerpPosition>> {
            let url = format!("{}/position", self.base_url.trim_end_matches('/'));
            let response: PositionResponse = self
                .client
                .get(&url)
                .query(&[("market_index", market_index.to_string()), ("owner", owner.to_string())])
                .send()
                .await
                .map_err(|e| PerpVenueError::Request(e.to_string()))?
                .json()
                .await
                .map_err(|e| PerpVenueError::Request(e.to_string()))?;
            Ok(response.position)
        }

        async fn total_collateral(&self, owner: &str) -> Result<Decimal> {
            Ok(self.collateral(owner).await?.total)
        }

        async fn free_collateral(&self, owner: &str) -> Result<Decimal> {
            Ok(self.collateral(owner).await?.free)
        }

        async fn deposit_collateral(
            &self,
            owner: &str,
            amount: Decimal,
            wallet_keypair: Arc<Keypair>,
        ) -> Result<String> {
            let url = format!("{}/collateral/deposit", self.base_url.trim_end_matches('/'));
            let response: UnsignedTxResponse = self
                .client
                .post(&url)
                .json(&DepositRequest { owner, amount })
                .send()
                .await
                .map_err(|e| PerpVenueError::Request(e.to_string()))?
                .json()
                .await
                .map_err(|e| PerpVenueError::Request(e.to_string()))?;
            self.sign_submit_confirm(&response.unsigned_transaction, &wallet_keypair)
                .await
        }

        async fn open_position(&self, request: OpenPositionRequest) -> Result<PerpPosition> {
            let url = format!("{}/positions/open", self.base_url.trim_end_matches('/'));
            let owner = request.wallet_keypair.pubkey().to_string();
            let body = OpenPositionBody {
                market_index: request.market_index,
                direction: request.direction,
                base_qty: request.base_qty,
                leverage: request.leverage,
                max_slippage: request.max_slippage,
                owner: &owner,
            };
            let response: OpenPositionResponse = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| PerpVenueError::Request(e.to_string()))?
                .json()
                .await
                .map_err(|e| PerpVenueError::Request(e.to_string()))?;
            self.sign_submit_confirm(&response.unsigned_transaction, &request.wallet_keypair)
                .await?;
            Ok(response.position)
        }

        async fn close_position(
            &self,
            market_index: u32,
            owner: &str,
            wallet_keypair: Arc<Keypair>,
        ) -> Result<String> {
            let url = format!("{}/positions/close", self.base_url.trim_end_matches('/'));
            let response = self
                .client
                .post(&url)
                .query(&[("market_index", market_index.to_string()), ("owner", owner.to_string())])
                .send()
                .await
                .map_err(|e| PerpVenueError::Request(e.to_string()))?;

            if response.status().as_u16() == 404 {
                return Err(PerpVenueError::NoOpenPosition);
            }
            let parsed: UnsignedTxResponse = response
                .json()
                .await
                .map_err(|e| PerpVenueError::Request(e.to_string()))?;
            self.sign_submit_confirm(&parsed.unsigned_transaction, &wallet_keypair)
                .await
        }
    }

    impl HttpPerpVenue {
        async fn collateral(&self, owner: &str) -> Result<CollateralResponse> {
            let url = format!("{}/collateral", self.base_url.trim_end_matches('/'));
            self.client
                .get(&url)
                .query(&[("owner", owner)])
                .send()
                .await
                .map_err(|e| PerpVenueError::Request(e.to_string()))?
                .json()
                .await
                .map_err(|e| PerpVenueError::Request(e.to_string()))
        }
    }
}

pub use http::HttpPerpVenue;
