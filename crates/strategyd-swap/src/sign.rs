//! Local signing of a swap service's unsigned, serialized transaction.
//! The wallet keypair never leaves the worker process; only the signed
//! wire bytes go back out over the chain RPC.

use base64::Engine;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::VersionedTransaction;

pub fn sign_transaction(tx_base64: &str, keypair: &Keypair) -> Result<String, String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(tx_base64)
        .map_err(|e| format!("invalid base64 transaction: {e}"))?;
    let unsigned: VersionedTransaction =
        bincode::deserialize(&bytes).map_err(|e| format!("invalid transaction payload: {e}"))?;

    let signed = VersionedTransaction::try_new(unsigned.message, &[keypair])
        .map_err(|e| format!("signing failed: {e}"))?;

    let signed_bytes =
        bincode::serialize(&signed).map_err(|e| format!("failed to serialize signed tx: {e}"))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(signed_bytes))
}
