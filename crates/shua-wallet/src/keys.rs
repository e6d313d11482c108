//! Payment and identity key material.
//!
//! A wallet holds two independent secp256k1 keys: the payment key owns the
//! coins and signs transaction inputs, the identity key signs social
//! payloads. Both are exported and restored as WIF strings.

use std::fmt;

use shua_core::address::{Address, Network};
use shua_core::crypto::KeyPair;
use zeroize::Zeroizing;

use crate::error::WalletError;
use crate::store::WalletRecord;

/// Derive the P2PKH address of a key. Pure and deterministic.
pub fn derive_address(key: &KeyPair, network: Network) -> Address {
    key.address(network)
}

/// The two private keys backing a wallet.
#[derive(Clone)]
pub struct KeyMaterial {
    payment: KeyPair,
    identity: KeyPair,
    network: Network,
}

impl KeyMaterial {
    /// Generate a fresh payment and identity key from the OS random source.
    pub fn generate(network: Network) -> Result<Self, WalletError> {
        let payment = KeyPair::generate().map_err(|e| WalletError::Entropy(e.to_string()))?;
        let identity = KeyPair::generate().map_err(|e| WalletError::Entropy(e.to_string()))?;
        tracing::debug!(%network, "generated wallet keys");
        Ok(Self {
            payment,
            identity,
            network,
        })
    }

    /// Wrap existing key pairs.
    pub fn from_keys(payment: KeyPair, identity: KeyPair, network: Network) -> Self {
        Self {
            payment,
            identity,
            network,
        }
    }

    /// Restore from the identity (owner) WIF and the payment WIF, in that order.
    ///
    /// The network is taken from the payment key's version byte. Both keys
    /// must agree on it.
    pub fn restore(identity_wif: &str, payment_wif: &str) -> Result<Self, WalletError> {
        let (payment, network) = decode_wif("payment", payment_wif)?;
        let (identity, identity_network) = decode_wif("identity", identity_wif)?;
        if network != identity_network {
            return Err(WalletError::InvalidKeyEncoding(format!(
                "payment key is {network} but identity key is {identity_network}"
            )));
        }
        Ok(Self {
            payment,
            identity,
            network,
        })
    }

    /// Restore from a persisted wallet record.
    pub fn from_record(record: &WalletRecord) -> Result<Self, WalletError> {
        let keys = Self::restore(&record.owner_key, &record.wallet_key)?;
        if keys.payment_address().encode() != record.wallet_address {
            return Err(WalletError::InvalidKeyEncoding(
                "payment key does not match stored address".into(),
            ));
        }
        Ok(keys)
    }

    /// Export both keys plus their derived addresses.
    pub fn to_record(&self) -> WalletRecord {
        WalletRecord {
            owner_key: self.identity.to_wif(self.network),
            owner_address: self.identity_address().encode(),
            owner_public_key: self.identity_public_key(),
            wallet_key: self.payment.to_wif(self.network),
            wallet_address: self.payment_address().encode(),
        }
    }

    /// The `(identity, payment)` WIF pair accepted by [`KeyMaterial::restore`].
    pub fn export(&self) -> (Zeroizing<String>, Zeroizing<String>) {
        (
            Zeroizing::new(self.identity.to_wif(self.network)),
            Zeroizing::new(self.payment.to_wif(self.network)),
        )
    }

    pub fn payment_key(&self) -> &KeyPair {
        &self.payment
    }

    pub fn identity_key(&self) -> &KeyPair {
        &self.identity
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Address holding the wallet's coins; also the change address.
    pub fn payment_address(&self) -> Address {
        derive_address(&self.payment, self.network)
    }

    /// Compressed identity public key, hex encoded.
    pub fn identity_public_key(&self) -> String {
        self.identity.public_key().to_string()
    }

    /// Address that identifies the author of signed social payloads.
    pub fn identity_address(&self) -> Address {
        derive_address(&self.identity, self.network)
    }
}

fn decode_wif(label: &str, wif: &str) -> Result<(KeyPair, Network), WalletError> {
    KeyPair::from_wif(wif.trim())
        .map_err(|e| WalletError::InvalidKeyEncoding(format!("{label} key: {e}")))
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("network", &self.network)
            .field("payment_address", &self.payment_address().encode())
            .field("identity_address", &self.identity_address().encode())
            .finish()
    }
}
