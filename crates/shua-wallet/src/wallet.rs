//! High-level wallet service.
//!
//! [`Wallet`] ties the coin source, the builder and the broadcast gateway
//! together. It holds no key material itself: every call takes the
//! [`KeyMaterial`] to spend from, so one service can serve many wallets.

use std::sync::Arc;

use shua_core::address::Address;
use shua_core::constants::SEND_MAX_BUFFER;
use shua_core::types::{Txid, Utxo};

use crate::broadcast::Broadcaster;
use crate::builder::{SignedTransaction, TransactionBuilder, UnsignedTransaction};
use crate::error::WalletError;
use crate::indexer::UtxoSource;
use crate::keys::KeyMaterial;

/// Sending, publishing and balance queries against injected network services.
pub struct Wallet {
    source: Arc<dyn UtxoSource>,
    broadcaster: Arc<dyn Broadcaster>,
    builder: TransactionBuilder,
}

impl Wallet {
    pub fn new(source: Arc<dyn UtxoSource>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            source,
            broadcaster,
            builder: TransactionBuilder::new(),
        }
    }

    /// Replace the builder (fee rate, expected inputs).
    pub fn with_builder(mut self, builder: TransactionBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Sum of the payment address's unspent coins, in satoshis.
    pub async fn balance(&self, keys: &KeyMaterial) -> Result<u64, WalletError> {
        let coins = self.source.fetch_unspent(&keys.payment_address()).await?;
        Ok(total(&coins))
    }

    /// Pay `satoshis` to `to` and broadcast.
    ///
    /// Requesting exactly the whole balance is a send-max: the payment is
    /// reduced by a small buffer so the fee still fits.
    pub async fn send(
        &self,
        keys: &KeyMaterial,
        to: &str,
        satoshis: u64,
    ) -> Result<Txid, WalletError> {
        if satoshis == 0 {
            return Err(WalletError::InvalidAmount("amount must be positive".into()));
        }
        let recipient = self.parse_recipient(keys, to)?;
        let coins = self.source.fetch_unspent(&keys.payment_address()).await?;
        let balance = total(&coins);
        if balance < satoshis {
            return Err(WalletError::InsufficientFunds {
                have: balance,
                need: satoshis,
            });
        }
        self.pay(keys, &recipient, satoshis, &coins).await
    }

    /// Sweep the entire balance to `to`, less the send-max buffer and fee.
    pub async fn send_max(&self, keys: &KeyMaterial, to: &str) -> Result<Txid, WalletError> {
        let recipient = self.parse_recipient(keys, to)?;
        let coins = self.source.fetch_unspent(&keys.payment_address()).await?;
        let balance = total(&coins);
        if balance == 0 {
            return Err(WalletError::InsufficientFunds { have: 0, need: 1 });
        }
        self.pay(keys, &recipient, balance, &coins).await
    }

    /// Fund and sign `unsigned` from the payment address without broadcasting.
    pub async fn pay_for(
        &self,
        keys: &KeyMaterial,
        unsigned: UnsignedTransaction,
    ) -> Result<SignedTransaction, WalletError> {
        let payment_address = keys.payment_address();
        let coins = self.source.fetch_unspent(&payment_address).await?;
        self.builder
            .build_and_sign(unsigned, &coins, &payment_address, keys.payment_key())
    }

    /// Embed `tokens` in a data output, fund it and broadcast.
    pub async fn publish(
        &self,
        keys: &KeyMaterial,
        tokens: &[Vec<u8>],
    ) -> Result<Txid, WalletError> {
        let mut unsigned = UnsignedTransaction::new();
        unsigned.add_data(tokens);
        let signed = self.pay_for(keys, unsigned).await?;
        let txid = self.broadcaster.broadcast(&signed).await?;
        tracing::info!(%txid, tokens = tokens.len(), fee = signed.fee(), "published data");
        Ok(txid)
    }

    fn parse_recipient(&self, keys: &KeyMaterial, to: &str) -> Result<Address, WalletError> {
        let recipient = Address::decode(to)?;
        if recipient.network() != keys.network() {
            return Err(WalletError::InvalidAddress(format!(
                "{to} is a {} address, wallet is on {}",
                recipient.network(),
                keys.network()
            )));
        }
        Ok(recipient)
    }

    async fn pay(
        &self,
        keys: &KeyMaterial,
        recipient: &Address,
        satoshis: u64,
        coins: &[Utxo],
    ) -> Result<Txid, WalletError> {
        let balance = total(coins);
        let amount = if satoshis == balance {
            satoshis.checked_sub(SEND_MAX_BUFFER).filter(|a| *a > 0).ok_or_else(|| {
                WalletError::InvalidAmount(format!(
                    "balance of {balance} is too small to send"
                ))
            })?
        } else {
            satoshis
        };

        let mut unsigned = UnsignedTransaction::new();
        unsigned.pay_to(recipient, amount);
        let payment_address = keys.payment_address();
        let signed =
            self.builder
                .build_and_sign(unsigned, coins, &payment_address, keys.payment_key())?;
        let txid = self.broadcaster.broadcast(&signed).await?;
        tracing::info!(%txid, %recipient, amount, fee = signed.fee(), "payment sent");
        Ok(txid)
    }
}

fn total(coins: &[Utxo]) -> u64 {
    coins.iter().fold(0u64, |acc, u| acc.saturating_add(u.satoshis))
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("builder", &self.builder)
            .finish_non_exhaustive()
    }
}
