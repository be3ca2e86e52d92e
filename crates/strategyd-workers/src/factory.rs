//! Builds a live [`Worker`] from a [`StrategyRecord`] (§4.3 "Worker
//! construction"). Only the Supervisor calls this, once per reconcile-cycle
//! start decision. Any error here is a construction-time failure (§7
//! "Configuration error" or escrow failure) — it aborts just this worker's
//! start, never the reconcile cycle.

use crate::context::WorkerDeps;
use crate::error::WorkerError;
use crate::escrow::KeyEscrow;
use crate::worker::Worker;
use crate::workers::{
    LevelsWorker, PairTradeWorker, PerpPositionWorker, PriceMonitorWorker, VaultWorker,
    WalletMonitorWorker,
};
use solana_sdk::signature::Keypair;
use std::sync::Arc;
use strategyd_core::StrategyConfig;
use strategyd_store::StrategyRecord;

/// Decrypts the trading wallet's key, validates kind/config agreement and
/// the kind-specific config invariants, and constructs the matching
/// [`Worker`] — but does not start it; the caller (`strategyd-supervisor`)
/// does that via [`crate::worker::spawn`].
pub async fn build_worker(
    record: StrategyRecord,
    deps: WorkerDeps,
    escrow: &dyn KeyEscrow,
) -> Result<Box<dyn Worker>, WorkerError> {
    record
        .strategy
        .check_kind_invariant()
        .map_err(|e| WorkerError::InvalidConfig(e.to_string()))?;

    let key_bytes = escrow
        .private_key_bytes(&record.strategy.trading_wallet_id)
        .await
        .map_err(|e| WorkerError::KeyEscrow(e.to_string()))?;
    let keypair = Arc::new(
        Keypair::from_bytes(&key_bytes)
            .map_err(|e| WorkerError::InvalidConfig(format!("malformed keypair bytes: {e}")))?,
    );

    let strategy_id = record.strategy.id.clone();
    let trading_wallet_id = record.strategy.trading_wallet_id.clone();
    let wallet_pubkey = record.trading_wallet_public_key.clone();

    let worker: Box<dyn Worker> = match record.strategy.config {
        StrategyConfig::PriceMonitor(cfg) => {
            cfg.validate()
                .map_err(|e| WorkerError::InvalidConfig(e.to_string()))?;
            Box::new(PriceMonitorWorker::new(
                strategy_id,
                trading_wallet_id,
                wallet_pubkey,
                keypair,
                deps,
                cfg,
            ))
        }
        StrategyConfig::WalletMonitor(cfg) => {
            cfg.validate()
                .map_err(|e| WorkerError::InvalidConfig(e.to_string()))?;
            Box::new(WalletMonitorWorker::new(
                strategy_id,
                trading_wallet_id,
                wallet_pubkey,
                keypair,
                deps,
                cfg,
            ))
        }
        // VaultConfig's invariants (non-negative, capped percentage) are
        // enforced by VaultConfig::new at admission; nothing left to check
        // here since any row in the Store has already passed it once.
        StrategyConfig::Vault(cfg) => Box::new(VaultWorker::new(
            strategy_id,
            trading_wallet_id,
            wallet_pubkey,
            keypair,
            deps,
            cfg,
        )),
        StrategyConfig::Levels(cfg) => {
            let cfg = cfg.with_validated_levels();
            Box::new(LevelsWorker::new(
                strategy_id,
                trading_wallet_id,
                wallet_pubkey,
                keypair,
                deps,
                cfg,
            ))
        }
        StrategyConfig::PairTrade(cfg) => {
            cfg.validate()
                .map_err(|e| WorkerError::InvalidConfig(e.to_string()))?;
            Box::new(PairTradeWorker::new(
                strategy_id,
                trading_wallet_id,
                wallet_pubkey,
                keypair,
                deps,
                cfg,
            ))
        }
        StrategyConfig::PerpPosition(cfg) => {
            cfg.validate()
                .map_err(|e| WorkerError::InvalidConfig(e.to_string()))?;
            Box::new(PerpPositionWorker::new(
                strategy_id,
                trading_wallet_id,
                wallet_pubkey,
                keypair,
                deps,
                cfg,
            ))
        }
    };

    Ok(worker)
}
