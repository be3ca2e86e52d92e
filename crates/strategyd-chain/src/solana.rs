//! Solana implementation of [`ChainRpc`], backed by the non-blocking JSON-RPC
//! client for request/response calls and the pubsub client for `on_logs`
//! account subscriptions.

use crate::error::{ChainError, Result};
use crate::rpc::ChainRpc;
use crate::types::{AccountInfo, Confirmation, LogEvent, LogsCallback, LogsSubscriptionId, ObservedSwap};
use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::StreamExt;
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{
    RpcTransactionConfig, RpcTransactionLogsConfig, RpcTransactionLogsFilter,
};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use solana_transaction_status::option_serializer::OptionSerializer;
use solana_transaction_status::{UiTransactionEncoding, UiTransactionTokenBalance};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, warn};

pub struct SolanaChainRpc {
    rpc: RpcClient,
    ws_url: String,
    next_sub_id: AtomicU64,
    subscriptions: DashMap<u64, Arc<Notify>>,
}

impl SolanaChainRpc {
    pub fn new(rpc_url: impl Into<String>, ws_url: impl Into<String>) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(rpc_url.into(), CommitmentConfig::confirmed()),
            ws_url: ws_url.into(),
            next_sub_id: AtomicU64::new(1),
            subscriptions: DashMap::new(),
        }
    }

    fn parse_pubkey(s: &str) -> Result<Pubkey> {
        Pubkey::from_str(s).map_err(|_| ChainError::InvalidAddress(s.to_string()))
    }
}

#[async_trait]
impl ChainRpc for SolanaChainRpc {
    async fn native_balance(&self, pubkey: &str) -> Result<u64> {
        let key = Self::parse_pubkey(pubkey)?;
        self.rpc
            .get_balance(&key)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn token_balance(&self, owner: &str, mint: &str) -> Result<u64> {
        let owner_key = Self::parse_pubkey(owner)?;
        let mint_key = Self::parse_pubkey(mint)?;
        let ata = spl_associated_token_address(&owner_key, &mint_key);

        match self.rpc.get_token_account_balance(&ata).await {
            Ok(balance) => balance
                .amount
                .parse::<u64>()
                .map_err(|e| ChainError::Rpc(e.to_string())),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("could not find account") || msg.contains("AccountNotFound") {
                    Ok(0)
                } else {
                    Err(ChainError::Rpc(msg))
                }
            }
        }
    }

    async fn parsed_account_info(&self, address: &str) -> Result<Option<AccountInfo>> {
        let key = Self::parse_pubkey(address)?;
        match self.rpc.get_account(&key).await {
            Ok(account) => Ok(Some(AccountInfo {
                owner: account.owner.to_string(),
                lamports: account.lamports,
                data: account.data,
                executable: account.executable,
            })),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("AccountNotFound") {
                    Ok(None)
                } else {
                    Err(ChainError::Rpc(msg))
                }
            }
        }
    }

    async fn latest_blockhash(&self) -> Result<String> {
        let hash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(hash.to_string())
    }

    async fn submit_transaction(&self, tx_base64: &str) -> Result<String> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(tx_base64)
            .map_err(|e| ChainError::InvalidTransaction(e.to_string()))?;
        let tx: VersionedTransaction = bincode::deserialize(&bytes)
            .map_err(|e| ChainError::InvalidTransaction(e.to_string()))?;

        let signature = self
            .rpc
            .send_transaction(&tx)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(signature.to_string())
    }

    async fn confirm_transaction(&self, signature: &str) -> Result<Confirmation> {
        let sig = Signature::from_str(signature)
            .map_err(|e| ChainError::InvalidTransaction(e.to_string()))?;

        match self.rpc.confirm_transaction(&sig).await {
            Ok(confirmed) => Ok(Confirmation {
                confirmed,
                slot: None,
                err: None,
            }),
            Err(e) => Ok(Confirmation {
                confirmed: false,
                slot: None,
                err: Some(e.to_string()),
            }),
        }
    }

    async fn on_logs(&self, address: &str, callback: LogsCallback) -> Result<LogsSubscriptionId> {
        let key = Self::parse_pubkey(address)?;
        let id = self.next_sub_id.fetch_add(1, Ordering::SeqCst);
        let stop = Arc::new(Notify::new());
        self.subscriptions.insert(id, stop.clone());

        let ws_url = self.ws_url.clone();
        let filter = RpcTransactionLogsFilter::Mentions(vec![key.to_string()]);
        let config = RpcTransactionLogsConfig {
            commitment: Some(CommitmentConfig::confirmed()),
        };

        tokio::spawn(async move {
            let client = match PubsubClient::new(&ws_url).await {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "failed to open pubsub client for on_logs");
                    return;
                }
            };
            let (mut stream, unsubscribe) = match client.logs_subscribe(filter, config).await {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "logs_subscribe failed");
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = stop.notified() => {
                        unsubscribe().await;
                        break;
                    }
                    next = stream.next() => {
                        match next {
                            Some(response) => {
                                let value = response.value;
                                callback(LogEvent {
                                    signature: value.signature,
                                    logs: value.logs,
                                    err: value.err.map(|e| e.to_string()),
                                });
                            }
                            None => {
                                debug!("log subscription stream ended");
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(LogsSubscriptionId(id))
    }

    async fn remove_on_logs(&self, id: LogsSubscriptionId) -> Result<()> {
        match self.subscriptions.remove(&id.0) {
            Some((_, stop)) => {
                stop.notify_one();
                Ok(())
            }
            None => Err(ChainError::UnknownSubscription),
        }
    }

    async fn observed_swap(&self, signature: &str, owner: &str) -> Result<Option<ObservedSwap>> {
        let sig = Signature::from_str(signature)
            .map_err(|e| ChainError::InvalidTransaction(e.to_string()))?;

        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };

        let tx = match self.rpc.get_transaction_with_config(&sig, config).await {
            Ok(tx) => tx,
            Err(e) => {
                warn!(error = %e, signature, "failed to fetch transaction for balance delta");
                return Ok(None);
            }
        };

        let Some(meta) = tx.transaction.meta else {
            return Ok(None);
        };
        let (OptionSerializer::Some(pre), OptionSerializer::Some(post)) =
            (meta.pre_token_balances, meta.post_token_balances)
        else {
            return Ok(None);
        };

        let owned_by = |b: &UiTransactionTokenBalance| matches!(&b.owner, OptionSerializer::Some(o) if o == owner);

        let mut largest_decrease: Option<ObservedSwap> = None;
        for post_entry in post.iter().filter(|b| owned_by(b)) {
            let pre_entry = pre
                .iter()
                .find(|b| owned_by(b) && b.mint == post_entry.mint);
            let pre_amount: u64 = pre_entry
                .map(|b| b.ui_token_amount.amount.parse().unwrap_or(0))
                .unwrap_or(0);
            let post_amount: u64 = post_entry.ui_token_amount.amount.parse().unwrap_or(0);

            if post_amount >= pre_amount {
                continue;
            }
            let decrease = pre_amount - post_amount;
            let is_larger = largest_decrease
                .as_ref()
                .map(|d| decrease > d.amount_sold)
                .unwrap_or(true);
            if is_larger {
                largest_decrease = Some(ObservedSwap {
                    sold_mint: post_entry.mint.clone(),
                    pre_balance: pre_amount,
                    amount_sold: decrease,
                });
            }
        }

        Ok(largest_decrease)
    }
}

fn spl_associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(owner, mint)
}
