//! # shua-wallet: key material, coin selection and transaction assembly.
//!
//! Turns a pair of private keys into spendable payments: fetches coins from
//! an indexer, selects a covering subset, prices the transaction, attaches
//! change, signs every input and hands the result to a broadcast gateway.
//!
//! # Modules
//!
//! - [`error`]: `WalletError` enum
//! - [`keys`]: `KeyMaterial`: payment and identity keys
//! - [`indexer`]: `UtxoSource` trait and the HTTP indexer client
//! - [`coin_selection`]: first-fit single coin, then first-fit accumulate
//! - [`fee`]: size-based fee estimation
//! - [`builder`]: transaction assembly and signing
//! - [`broadcast`]: `Broadcaster` trait and the HTTP relay client
//! - [`store`]: injected persistence for the wallet record
//! - [`encryption`]: AES-256-GCM wallet file encryption
//! - [`wallet`]: high-level send / publish service

pub mod broadcast;
pub mod builder;
pub mod coin_selection;
pub mod encryption;
pub mod error;
pub mod fee;
pub mod indexer;
pub mod keys;
pub mod store;
pub mod wallet;

// Re-exports for convenient access
pub use broadcast::{BroadcastClient, Broadcaster};
pub use builder::{SignedTransaction, TransactionBuilder, UnsignedTransaction};
pub use coin_selection::{CoinSelection, CoinSelector};
pub use error::WalletError;
pub use fee::{FeeEstimator, estimate_fee};
pub use indexer::{IndexerClient, UtxoSource, normalize_unspent};
pub use keys::{KeyMaterial, derive_address};
pub use store::{EncryptedFileStore, KeyStore, MemoryKeyStore, WalletRecord};
pub use wallet::Wallet;
