//! The Swap Driver (C2 / §4.2): quote → build → sign → submit → confirm,
//! escalating slippage on a recoverable failure and aborting immediately on
//! anything else.

use crate::error::{Result, SwapError};
use crate::ladder::{build_ladder, is_slippage_error};
use crate::service::SwapService;
use crate::sign::sign_transaction;
use crate::tx_log::{TransactionLog, TransactionLogRow};
use crate::types::{SwapRequest, SwapResult};
use chrono::Utc;
use std::sync::Arc;
use strategyd_bus::TradeEventBus;
use strategyd_chain::ChainRpc;
use strategyd_core::{Mint, StrategyId, StrategyKind, TradeSuccessEvent, TradingWalletId};
use tracing::{info, warn};

enum AttemptError {
    Slippage(String),
    Fatal(String),
}

fn classify(message: String) -> AttemptError {
    if is_slippage_error(&message) {
        AttemptError::Slippage(message)
    } else {
        AttemptError::Fatal(message)
    }
}

/// Context identifying who is swapping, threaded through so the driver can
/// publish a [`TradeSuccessEvent`] and log a `transactions` row without the
/// caller re-deriving those fields after the fact.
pub struct SwapContext {
    pub strategy_id: StrategyId,
    pub strategy_kind: StrategyKind,
    pub trading_wallet_id: Option<TradingWalletId>,
    pub wallet_pubkey: String,
}

pub struct SwapDriver {
    swap_service: Arc<dyn SwapService>,
    chain: Arc<dyn ChainRpc>,
    bus: TradeEventBus,
    tx_log: Option<Arc<dyn TransactionLog>>,
    fee_reserve_lamports: u64,
    native_mint: Mint,
}

impl SwapDriver {
    pub fn new(
        swap_service: Arc<dyn SwapService>,
        chain: Arc<dyn ChainRpc>,
        bus: TradeEventBus,
        native_mint: Mint,
        fee_reserve_lamports: u64,
    ) -> Self {
        Self {
            swap_service,
            chain,
            bus,
            tx_log: None,
            fee_reserve_lamports,
            native_mint,
        }
    }

    pub fn with_transaction_log(mut self, tx_log: Arc<dyn TransactionLog>) -> Self {
        self.tx_log = Some(tx_log);
        self
    }

    /// Executes `request`, retrying up the slippage ladder on recoverable
    /// failures. On success, publishes a `TradeSuccessEvent` and
    /// best-effort logs a `transactions` row.
    pub async fn execute(&self, request: SwapRequest, context: SwapContext) -> Result<SwapResult> {
        if request.amount == 0 {
            return Err(SwapError::Fatal("swap amount must be positive".into()));
        }

        // Fee headroom (§4.2 preconditions): the wallet must always hold
        // enough native balance to cover fees, regardless of which token is
        // being swapped in.
        let native_balance = self.chain.native_balance(&context.wallet_pubkey).await?;
        if native_balance < self.fee_reserve_lamports {
            return Err(SwapError::InsufficientFeeHeadroom);
        }

        // When the input is itself the native token, the fee reserve must
        // be held back on top of the amount being swapped away.
        if request.input_mint == self.native_mint
            && native_balance < request.amount.saturating_add(self.fee_reserve_lamports)
        {
            return Err(SwapError::InsufficientFeeHeadroom);
        }

        let ladder = build_ladder(request.slippage_bps);
        let last_rung = ladder.len() - 1;

        for (i, &slippage_bps) in ladder.iter().enumerate() {
            match self.attempt(&request, &context, slippage_bps).await {
                Ok(mut result) => {
                    if i > 0 {
                        result.message = format!(
                            "succeeded with {:.1}% slippage after {} attempts",
                            slippage_bps as f64 / 100.0,
                            i + 1
                        );
                    }
                    info!(
                        strategy_id = %context.strategy_id,
                        signature = %result.signature,
                        attempts = i + 1,
                        "swap confirmed"
                    );
                    self.on_success(&context, &request, &result).await;
                    return Ok(result);
                }
                Err(AttemptError::Slippage(cause)) => {
                    if i < last_rung {
                        continue;
                    }
                    return Err(SwapError::LadderExhausted {
                        attempts: ladder.len(),
                        final_slippage_bps: slippage_bps,
                        cause,
                    });
                }
                Err(AttemptError::Fatal(cause)) => {
                    return Err(SwapError::Fatal(cause));
                }
            }
        }

        unreachable!("ladder always has at least one rung")
    }

    async fn attempt(
        &self,
        request: &SwapRequest,
        context: &SwapContext,
        slippage_bps: u16,
    ) -> std::result::Result<SwapResult, AttemptError> {
        let quote = self
            .swap_service
            .quote(
                &request.input_mint,
                &request.output_mint,
                request.amount,
                slippage_bps,
                request.platform_fee_bps,
            )
            .await
            .map_err(|e| classify(e.to_string()))?;

        let unsigned_tx = self
            .swap_service
            .build_swap(&quote, &context.wallet_pubkey, request.fee_account.as_deref())
            .await
            .map_err(|e| classify(e.to_string()))?;

        let signed_tx = sign_transaction(&unsigned_tx, &request.wallet_keypair)
            .map_err(AttemptError::Fatal)?;

        let signature = self
            .chain
            .submit_transaction(&signed_tx)
            .await
            .map_err(|e| classify(e.to_string()))?;

        let confirmation = self
            .chain
            .confirm_transaction(&signature)
            .await
            .map_err(|e| classify(e.to_string()))?;

        if !confirmation.confirmed {
            let cause = confirmation
                .err
                .unwrap_or_else(|| "transaction not confirmed".to_string());
            return Err(classify(cause));
        }

        Ok(SwapResult {
            signature,
            input_amount: quote.in_amount,
            output_amount: quote.out_amount,
            message: String::new(),
        })
    }

    async fn on_success(&self, context: &SwapContext, request: &SwapRequest, result: &SwapResult) {
        self.bus.publish(TradeSuccessEvent {
            strategy_id: context.strategy_id.clone(),
            trading_wallet_pubkey: context.wallet_pubkey.clone(),
            strategy_kind: context.strategy_kind,
            signature: result.signature.clone(),
            timestamp: Utc::now(),
            amount: Some(result.output_amount),
            profit: None,
        });

        if let (Some(tx_log), Some(trading_wallet_id)) =
            (&self.tx_log, context.trading_wallet_id.clone())
        {
            let row = TransactionLogRow {
                trading_wallet_id,
                signature: result.signature.clone(),
                input_mint: request.input_mint.clone(),
                output_mint: request.output_mint.clone(),
                input_amount: result.input_amount,
                output_amount: result.output_amount,
                at: Utc::now(),
            };
            if let Err(e) = tx_log.record(row).await {
                warn!(error = %e, "transaction log write failed (best-effort, swap still succeeded)");
            }
        }
    }
}
