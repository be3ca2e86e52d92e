//! The Key Escrow interface (C6.4 / §6.4): decrypt-on-demand access to a
//! trading wallet's secret key. Only a Worker's construction step calls
//! this — the bytes are materialized once, turned into a `Keypair`, and
//! never cached or re-fetched; the Supervisor never holds key material.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use strategyd_core::TradingWalletId;
use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum EscrowError {
    #[error("decryption failed for wallet {0}: {1}")]
    DecryptionFailed(TradingWalletId, String),

    #[error("decrypted key has invalid length for wallet {0}: expected 64 bytes, got {1}")]
    InvalidKeyLength(TradingWalletId, usize),
}

pub type Result<T> = std::result::Result<T, EscrowError>;

#[async_trait]
pub trait KeyEscrow: Send + Sync {
    /// Decrypts and returns the 64-byte secret key for `trading_wallet_id`.
    /// Never cached by the caller.
    async fn private_key_bytes(&self, trading_wallet_id: &TradingWalletId) -> Result<[u8; 64]>;
}

#[derive(Debug, Deserialize)]
struct DecryptResponse {
    /// Base64-encoded 64-byte secret key.
    secret_key: String,
}

/// Calls an external key-escrow endpoint that answers
/// `POST {base_url}/wallets/{trading_wallet_id}/decrypt` with
/// `{"secret_key": <base64>}`. The bytes are never cached by this client;
/// every call hits the endpoint fresh, per §6.4.
pub struct HttpKeyEscrow {
    client: Client,
    base_url: String,
}

impl HttpKeyEscrow {
    pub fn new(base_url: impl Into<String>) -> std::result::Result<Self, EscrowError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| {
                EscrowError::DecryptionFailed(TradingWalletId::from(""), e.to_string())
            })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl KeyEscrow for HttpKeyEscrow {
    async fn private_key_bytes(&self, trading_wallet_id: &TradingWalletId) -> Result<[u8; 64]> {
        let url = format!(
            "{}/wallets/{}/decrypt",
            self.base_url.trim_end_matches('/'),
            trading_wallet_id.as_str()
        );

        let response = self.client.post(&url).send().await.map_err(|e| {
            EscrowError::DecryptionFailed(trading_wallet_id.clone(), e.to_string())
        })?;

        if !response.status().is_success() {
            return Err(EscrowError::DecryptionFailed(
                trading_wallet_id.clone(),
                format!("unexpected status {}", response.status()),
            ));
        }

        let parsed: DecryptResponse = response.json().await.map_err(|e| {
            EscrowError::DecryptionFailed(trading_wallet_id.clone(), e.to_string())
        })?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(parsed.secret_key)
            .map_err(|e| {
                EscrowError::DecryptionFailed(trading_wallet_id.clone(), e.to_string())
            })?;

        if bytes.len() != 64 {
            return Err(EscrowError::InvalidKeyLength(
                trading_wallet_id.clone(),
                bytes.len(),
            ));
        }
        let mut out = [0u8; 64];
        out.copy_from_slice(&bytes);
        Ok(out)
    }
}
