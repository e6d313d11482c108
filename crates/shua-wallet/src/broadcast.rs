//! Broadcast gateway: submits signed transactions to a relay.
//!
//! The HTTP relay takes `POST {base}/tx/broadcast` with `{"raw": "<hex>"}`
//! and answers `{"txid": ...}` on success or `{"message": ...}` on failure.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use shua_core::types::Txid;

use crate::builder::SignedTransaction;
use crate::error::WalletError;

pub const BROADCAST_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can publish a signed transaction to the network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Submit `tx`, returning the network's transaction id.
    async fn broadcast(&self, tx: &SignedTransaction) -> Result<Txid, WalletError>;
}

#[derive(Deserialize)]
struct BroadcastAccepted {
    txid: Option<String>,
}

#[derive(Deserialize)]
struct BroadcastRejected {
    message: Option<String>,
    error: Option<String>,
}

/// Pick the relay's rejection message out of an error body.
fn rejection_message(body: &str, status: reqwest::StatusCode) -> String {
    serde_json::from_str::<BroadcastRejected>(body)
        .ok()
        .and_then(|r| r.message.or(r.error))
        .unwrap_or_else(|| format!("relay returned {status}"))
}

/// Resolve the relay's acknowledgement to a txid, falling back to the local one.
fn accepted_txid(body: &str, local: Txid) -> Txid {
    let remote = serde_json::from_str::<BroadcastAccepted>(body)
        .ok()
        .and_then(|a| a.txid)
        .and_then(|s| Txid::from_hex(&s).ok());
    match remote {
        Some(txid) if txid != local => {
            tracing::warn!(%local, %txid, "relay reported a different txid");
            txid
        }
        Some(txid) => txid,
        None => local,
    }
}

/// HTTP relay client.
#[derive(Debug, Clone)]
pub struct BroadcastClient {
    client: Client,
    base_url: String,
}

impl BroadcastClient {
    pub fn new(base_url: &str) -> Result<Self, WalletError> {
        let client = Client::builder()
            .timeout(BROADCAST_TIMEOUT)
            .build()
            .map_err(|e| WalletError::BroadcastFailed(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl Broadcaster for BroadcastClient {
    async fn broadcast(&self, tx: &SignedTransaction) -> Result<Txid, WalletError> {
        let url = format!("{}/tx/broadcast", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "raw": tx.to_hex() }))
            .send()
            .await
            .map_err(|e| WalletError::BroadcastFailed(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| WalletError::BroadcastFailed(e.to_string()))?;

        if !status.is_success() {
            let message = rejection_message(&body, status);
            tracing::warn!(%status, %message, "broadcast rejected");
            return Err(WalletError::BroadcastFailed(message));
        }

        let txid = accepted_txid(&body, tx.txid());
        tracing::info!(%txid, "transaction broadcast");
        Ok(txid)
    }
}
