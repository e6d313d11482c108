//! Coin source: fetches and normalizes unspent outputs for an address.
//!
//! Indexers disagree on field names (`value`/`satoshis`, `txid`/`tx_hash`,
//! `vout`/`tx_pos`) and on whether the list is bare or wrapped in an
//! `unspent` object. [`normalize_unspent`] accepts all of them and drops
//! zero-value records.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use shua_core::address::Address;
use shua_core::types::{Txid, Utxo};

use crate::error::WalletError;

/// Default per-request timeout for indexer calls.
pub const INDEXER_TIMEOUT: Duration = Duration::from_secs(15);

/// Anything that can list the unspent coins of an address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UtxoSource: Send + Sync {
    async fn fetch_unspent(&self, address: &Address) -> Result<Vec<Utxo>, WalletError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UnspentResponse {
    List(Vec<RawUnspent>),
    Wrapped { unspent: Vec<RawUnspent> },
}

#[derive(Deserialize)]
struct RawUnspent {
    value: Option<u64>,
    satoshis: Option<u64>,
    txid: Option<String>,
    tx_hash: Option<String>,
    vout: Option<u32>,
    tx_pos: Option<u32>,
}

/// Convert an indexer JSON body into canonical coins locked to `address`.
pub fn normalize_unspent(
    body: serde_json::Value,
    address: &Address,
) -> Result<Vec<Utxo>, WalletError> {
    let response: UnspentResponse = serde_json::from_value(body)
        .map_err(|e| WalletError::IndexerUnavailable(format!("unexpected response: {e}")))?;
    let records = match response {
        UnspentResponse::List(records) | UnspentResponse::Wrapped { unspent: records } => records,
    };

    let script = address.script_pubkey();
    let mut utxos = Vec::with_capacity(records.len());
    for raw in records {
        let satoshis = raw.value.filter(|v| *v > 0).or(raw.satoshis).unwrap_or(0);
        if satoshis == 0 {
            tracing::debug!("skipping zero-value unspent record");
            continue;
        }
        let txid = raw
            .txid
            .or(raw.tx_hash)
            .ok_or_else(|| WalletError::IndexerUnavailable("record without txid".into()))?;
        let txid = Txid::from_hex(&txid)
            .map_err(|e| WalletError::IndexerUnavailable(e.to_string()))?;
        let vout = raw
            .vout
            .or(raw.tx_pos)
            .ok_or_else(|| WalletError::IndexerUnavailable("record without output index".into()))?;
        utxos.push(Utxo {
            txid,
            vout,
            satoshis,
            script: script.clone(),
        });
    }
    Ok(utxos)
}

/// HTTP indexer client (`GET {base}/address/{address}/unspent`).
#[derive(Debug, Clone)]
pub struct IndexerClient {
    client: Client,
    base_url: String,
}

impl IndexerClient {
    pub fn new(base_url: &str) -> Result<Self, WalletError> {
        let client = Client::builder()
            .timeout(INDEXER_TIMEOUT)
            .build()
            .map_err(|e| WalletError::IndexerUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl UtxoSource for IndexerClient {
    async fn fetch_unspent(&self, address: &Address) -> Result<Vec<Utxo>, WalletError> {
        let url = format!("{}/address/{}/unspent", self.base_url, address);
        let body: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| WalletError::IndexerUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| WalletError::IndexerUnavailable(e.to_string()))?;

        let utxos = normalize_unspent(body, address)?;
        tracing::debug!(%address, count = utxos.len(), "fetched unspent outputs");
        Ok(utxos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shua_core::address::Network;
    use shua_core::crypto::KeyPair;

    const TXID: &str = "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";

    fn address() -> Address {
        KeyPair::from_secret_bytes([8u8; 32])
            .unwrap()
            .address(Network::Mainnet)
    }

    #[test]
    fn bare_list_with_txid_vout_value() {
        let body = json!([{ "txid": TXID, "vout": 1, "value": 1500 }]);
        let utxos = normalize_unspent(body, &address()).unwrap();
        assert_eq!(utxos.len(), 1);
        assert_eq!(utxos[0].satoshis, 1500);
        assert_eq!(utxos[0].vout, 1);
        assert_eq!(utxos[0].txid.to_string(), TXID);
        assert_eq!(utxos[0].script, address().script_pubkey());
    }

    #[test]
    fn wrapped_list_with_alternate_names() {
        let body = json!({
            "address": address().encode(),
            "unspent": [{ "tx_hash": TXID, "tx_pos": 3, "satoshis": 42 }]
        });
        let utxos = normalize_unspent(body, &address()).unwrap();
        assert_eq!(utxos[0].satoshis, 42);
        assert_eq!(utxos[0].vout, 3);
    }

    #[test]
    fn zero_value_records_are_dropped() {
        let body = json!([
            { "txid": TXID, "vout": 0, "value": 0 },
            { "txid": TXID, "vout": 1 },
            { "txid": TXID, "vout": 2, "value": 7 }
        ]);
        let utxos = normalize_unspent(body, &address()).unwrap();
        assert_eq!(utxos.len(), 1);
        assert_eq!(utxos[0].vout, 2);
    }

    #[test]
    fn missing_identifier_is_an_error() {
        let body = json!([{ "vout": 0, "value": 10 }]);
        assert!(matches!(
            normalize_unspent(body, &address()),
            Err(WalletError::IndexerUnavailable(_))
        ));
        let body = json!([{ "txid": TXID, "value": 10 }]);
        assert!(matches!(
            normalize_unspent(body, &address()),
            Err(WalletError::IndexerUnavailable(_))
        ));
    }

    #[test]
    fn unexpected_shape_is_an_error() {
        assert!(matches!(
            normalize_unspent(json!({ "error": "rate limited" }), &address()),
            Err(WalletError::IndexerUnavailable(_))
        ));
    }

    #[test]
    fn empty_list_is_ok() {
        assert!(normalize_unspent(json!([]), &address()).unwrap().is_empty());
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = IndexerClient::new("https://api.bitails.io/").unwrap();
        assert_eq!(client.base_url(), "https://api.bitails.io");
    }

    #[tokio::test]
    async fn mock_source_returns_coins() {
        let mut source = MockUtxoSource::new();
        source
            .expect_fetch_unspent()
            .returning(|_| Ok(Vec::new()));
        assert!(source.fetch_unspent(&address()).await.unwrap().is_empty());
    }
}
