//! Persistence of the wallet record.
//!
//! The wallet never touches storage directly; callers inject a [`KeyStore`].
//! [`EncryptedFileStore`] keeps the record in a password-encrypted file:
//!
//! ```text
//! header_len (4 bytes LE) || header_json || encrypted_payload
//! ```
//!
//! The header is plain JSON holding magic and version. The payload is the
//! JSON record sealed by [`crate::encryption`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::encryption;
use crate::error::WalletError;

const WALLET_MAGIC: &str = "SHUA";
const WALLET_VERSION: u32 = 1;

/// The persisted keys and their derived addresses.
///
/// `owner_*` is the identity key, `wallet_*` the payment key. Keys are WIF.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    pub owner_key: String,
    pub owner_address: String,
    pub owner_public_key: String,
    pub wallet_key: String,
    pub wallet_address: String,
}

impl fmt::Debug for WalletRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletRecord")
            .field("owner_address", &self.owner_address)
            .field("wallet_address", &self.wallet_address)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

/// Injected storage for the wallet record.
pub trait KeyStore: Send + Sync {
    /// The stored record, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<WalletRecord>, WalletError>;

    /// Replace the stored record.
    fn save(&self, record: &WalletRecord) -> Result<(), WalletError>;
}

/// Process-local store, mostly for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryKeyStore {
    record: Mutex<Option<WalletRecord>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self) -> Result<Option<WalletRecord>, WalletError> {
        let guard = self
            .record
            .lock()
            .map_err(|_| WalletError::Storage("memory store poisoned".into()))?;
        Ok(guard.clone())
    }

    fn save(&self, record: &WalletRecord) -> Result<(), WalletError> {
        let mut guard = self
            .record
            .lock()
            .map_err(|_| WalletError::Storage("memory store poisoned".into()))?;
        *guard = Some(record.clone());
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct WalletFileHeader {
    magic: String,
    version: u32,
}

/// Password-encrypted wallet file.
pub struct EncryptedFileStore {
    path: PathBuf,
    password: Zeroizing<Vec<u8>>,
}

impl EncryptedFileStore {
    pub fn new(path: impl Into<PathBuf>, password: &[u8]) -> Self {
        Self {
            path: path.into(),
            password: Zeroizing::new(password.to_vec()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyStore for EncryptedFileStore {
    fn load(&self) -> Result<Option<WalletRecord>, WalletError> {
        let file_data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(WalletError::Storage(e.to_string())),
        };

        let (len_bytes, rest) = file_data
            .split_first_chunk::<4>()
            .ok_or_else(|| WalletError::CorruptedFile("file too short".into()))?;
        let header_len = u32::from_le_bytes(*len_bytes) as usize;
        if rest.len() < header_len {
            return Err(WalletError::CorruptedFile("header truncated".into()));
        }
        let (header_json, encrypted) = rest.split_at(header_len);

        let header: WalletFileHeader = serde_json::from_slice(header_json)
            .map_err(|e| WalletError::CorruptedFile(format!("invalid header: {e}")))?;
        if header.magic != WALLET_MAGIC {
            return Err(WalletError::CorruptedFile("invalid magic bytes".into()));
        }
        if header.version != WALLET_VERSION {
            return Err(WalletError::CorruptedFile(format!(
                "unsupported version: {}",
                header.version
            )));
        }

        let payload = Zeroizing::new(encryption::open(encrypted, &self.password)?);
        let record: WalletRecord = serde_json::from_slice(&payload)
            .map_err(|e| WalletError::CorruptedFile(format!("invalid payload: {e}")))?;
        tracing::debug!(path = %self.path.display(), "loaded wallet file");
        Ok(Some(record))
    }

    fn save(&self, record: &WalletRecord) -> Result<(), WalletError> {
        let header = WalletFileHeader {
            magic: WALLET_MAGIC.to_string(),
            version: WALLET_VERSION,
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|e| WalletError::Serialization(e.to_string()))?;
        let payload = Zeroizing::new(
            serde_json::to_vec(record).map_err(|e| WalletError::Serialization(e.to_string()))?,
        );
        let encrypted = encryption::seal(&payload, &self.password)?;

        let mut file_data = Vec::with_capacity(4 + header_json.len() + encrypted.len());
        file_data.extend_from_slice(&(header_json.len() as u32).to_le_bytes());
        file_data.extend_from_slice(&header_json);
        file_data.extend_from_slice(&encrypted);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| WalletError::Storage(e.to_string()))?;
        }
        std::fs::write(&self.path, &file_data).map_err(|e| WalletError::Storage(e.to_string()))?;
        tracing::info!(path = %self.path.display(), "saved wallet file");
        Ok(())
    }
}

impl fmt::Debug for EncryptedFileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedFileStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyMaterial;
    use shua_core::address::Network;
    use shua_core::crypto::KeyPair;

    fn record() -> WalletRecord {
        KeyMaterial::from_keys(
            KeyPair::from_secret_bytes([3u8; 32]).unwrap(),
            KeyPair::from_secret_bytes([4u8; 32]).unwrap(),
            Network::Mainnet,
        )
        .to_record()
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryKeyStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save(&record()).unwrap();
        assert_eq!(store.load().unwrap(), Some(record()));
    }

    #[test]
    fn record_uses_camel_case_fields() {
        let json = serde_json::to_value(record()).unwrap();
        assert!(json.get("ownerKey").is_some());
        assert!(json.get("walletAddress").is_some());
        assert!(json.get("ownerPublicKey").is_some());
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedFileStore::new(dir.path().join("nested/wallet.dat"), b"pw");
        store.save(&record()).unwrap();
        assert_eq!(store.load().unwrap(), Some(record()));
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = EncryptedFileStore::new(dir.path().join("absent.dat"), b"pw");
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn file_store_wrong_password() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.dat");
        EncryptedFileStore::new(&path, b"right").save(&record()).unwrap();
        let err = EncryptedFileStore::new(&path, b"wrong").load().unwrap_err();
        assert_eq!(err, WalletError::InvalidPassword);
    }

    #[test]
    fn file_store_corrupted_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.dat");
        std::fs::write(&path, [0xff, 0xff, 0xff, 0xff, b'{']).unwrap();
        let err = EncryptedFileStore::new(&path, b"pw").load().unwrap_err();
        assert!(matches!(err, WalletError::CorruptedFile(_)));
    }

    #[test]
    fn file_store_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.dat");
        std::fs::write(&path, [1, 2]).unwrap();
        let err = EncryptedFileStore::new(&path, b"pw").load().unwrap_err();
        assert!(matches!(err, WalletError::CorruptedFile(_)));
    }

    #[test]
    fn record_debug_redacts_keys() {
        let r = record();
        assert!(!format!("{r:?}").contains(&r.wallet_key));
    }
}
