//! Shared test helpers: key fixtures and an in-memory network.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

use shua_core::address::{Address, Network};
use shua_core::crypto::KeyPair;
use shua_core::types::{Transaction, Txid, Utxo};
use shua_wallet::{Broadcaster, KeyMaterial, SignedTransaction, UtxoSource, WalletError};

/// Deterministic key pair from a seed byte.
pub fn keypair(seed: u8) -> KeyPair {
    let mut secret = [seed; 32];
    secret[0] = 0x01;
    KeyPair::from_secret_bytes(secret).expect("valid secret")
}

/// Deterministic wallet keys on mainnet.
pub fn wallet_keys(seed: u8) -> KeyMaterial {
    KeyMaterial::from_keys(
        keypair(seed),
        keypair(seed.wrapping_add(100)),
        Network::Mainnet,
    )
}

/// Mainnet address derived from a seed byte.
pub fn address(seed: u8) -> Address {
    keypair(seed).address(Network::Mainnet)
}

/// A coin locked to `address`.
pub fn coin(txid_seed: u8, vout: u32, satoshis: u64, address: &Address) -> Utxo {
    Utxo {
        txid: Txid::from_bytes([txid_seed; 32]),
        vout,
        satoshis,
        script: address.script_pubkey(),
    }
}

#[derive(Default)]
struct NetworkState {
    coins: Vec<Utxo>,
    accepted: Vec<Transaction>,
    reject: Option<String>,
}

/// In-memory indexer plus relay.
///
/// Accepted transactions spend their inputs and index every positive
/// output, so balances move the way they would on a live network.
#[derive(Default)]
pub struct FakeNetwork {
    state: Mutex<NetworkState>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a coin in arrival order.
    pub fn fund(&self, utxo: Utxo) {
        self.state().coins.push(utxo);
    }

    /// Make every subsequent broadcast fail with `message`.
    pub fn reject_with(&self, message: &str) {
        self.state().reject = Some(message.to_owned());
    }

    /// Transactions accepted so far.
    pub fn accepted(&self) -> Vec<Transaction> {
        self.state().accepted.clone()
    }
}

#[async_trait]
impl UtxoSource for FakeNetwork {
    async fn fetch_unspent(&self, address: &Address) -> Result<Vec<Utxo>, WalletError> {
        let script = address.script_pubkey();
        Ok(self
            .state()
            .coins
            .iter()
            .filter(|u| u.script == script)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Broadcaster for FakeNetwork {
    async fn broadcast(&self, signed: &SignedTransaction) -> Result<Txid, WalletError> {
        let mut state = self.state();
        if let Some(message) = &state.reject {
            return Err(WalletError::BroadcastFailed(message.clone()));
        }

        let tx = Transaction::deserialize(&signed.raw())?;
        let txid = tx.txid();
        for input in &tx.inputs {
            let pos = state
                .coins
                .iter()
                .position(|u| u.outpoint() == input.previous_output)
                .ok_or_else(|| {
                    WalletError::BroadcastFailed(format!(
                        "missing input {}",
                        input.previous_output
                    ))
                })?;
            state.coins.remove(pos);
        }
        for (vout, output) in tx.outputs.iter().enumerate() {
            if output.value > 0 && output.script_pubkey.p2pkh_hash().is_some() {
                state.coins.push(Utxo {
                    txid,
                    vout: vout as u32,
                    satoshis: output.value,
                    script: output.script_pubkey.clone(),
                });
            }
        }
        state.accepted.push(tx);
        Ok(txid)
    }
}
