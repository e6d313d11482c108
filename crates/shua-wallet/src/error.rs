//! Wallet error types.

use shua_core::error::{AddressError, CryptoError, TransactionError};
use thiserror::Error;

/// Errors that can occur in wallet operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// A private key string failed to decode.
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// The coin indexer could not be reached or answered with garbage.
    #[error("indexer unavailable: {0}")]
    IndexerUnavailable(String),

    /// Insufficient funds to cover the transaction amount plus fees.
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds {
        /// Spendable balance in satoshis.
        have: u64,
        /// Required amount in satoshis.
        need: u64,
    },

    /// Invalid destination address string.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The relay rejected the transaction. Carries the relay's message.
    #[error("broadcast failed: {0}")]
    BroadcastFailed(String),

    /// Invalid monetary amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The random source could not produce key material.
    #[error("entropy: {0}")]
    Entropy(String),

    /// Persistence backend failure.
    #[error("storage: {0}")]
    Storage(String),

    /// Encryption failure.
    #[error("encryption: {0}")]
    Encryption(String),

    /// Decryption failure.
    #[error("decryption: {0}")]
    Decryption(String),

    /// Wrong password for wallet file.
    #[error("invalid password")]
    InvalidPassword,

    /// Wallet file is corrupted or has invalid format.
    #[error("corrupted file: {0}")]
    CorruptedFile(String),

    /// Serialization error.
    #[error("serialization: {0}")]
    Serialization(String),

    /// Transaction assembly error.
    #[error("build error: {0}")]
    BuildError(String),

    /// Cryptographic error from shua-core.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Transaction encoding error from shua-core.
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

impl From<AddressError> for WalletError {
    fn from(e: AddressError) -> Self {
        WalletError::InvalidAddress(e.to_string())
    }
}
