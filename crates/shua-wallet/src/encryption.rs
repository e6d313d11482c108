//! Password sealing for the wallet record.
//!
//! ```text
//! salt (16) || nonce (12) || AES-256-GCM ciphertext || tag (16)
//! ```
//!
//! The key is Argon2id(password, salt) with default parameters. Every call to
//! [`seal`] draws a fresh salt and nonce from the OS.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::Argon2;
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::WalletError;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Derive a 256-bit key from `password` and `salt` with Argon2id.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; 32]>, argon2::Error> {
    let mut key = Zeroizing::new([0u8; 32]);
    Argon2::default().hash_password_into(password, salt, &mut key[..])?;
    Ok(key)
}

fn cipher_for(password: &[u8], salt: &[u8]) -> Result<Aes256Gcm, String> {
    let key = derive_key(password, salt).map_err(|e| format!("key derivation: {e}"))?;
    Aes256Gcm::new_from_slice(&key[..]).map_err(|e| e.to_string())
}

fn random<const N: usize>() -> Result<[u8; N], WalletError> {
    let mut bytes = [0u8; N];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| WalletError::Entropy(e.to_string()))?;
    Ok(bytes)
}

/// Encrypt `plaintext` under `password`.
pub fn seal(plaintext: &[u8], password: &[u8]) -> Result<Vec<u8>, WalletError> {
    let salt: [u8; SALT_LEN] = random()?;
    let nonce: [u8; NONCE_LEN] = random()?;

    let sealed = cipher_for(password, &salt)
        .map_err(WalletError::Encryption)?
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| WalletError::Encryption(e.to_string()))?;

    Ok([&salt[..], &nonce[..], &sealed[..]].concat())
}

/// Decrypt the output of [`seal`].
///
/// A failed tag check means the password is wrong or the bytes were altered;
/// both surface as [`WalletError::InvalidPassword`].
pub fn open(sealed: &[u8], password: &[u8]) -> Result<Vec<u8>, WalletError> {
    let too_short = || {
        WalletError::CorruptedFile(format!(
            "sealed data is {} bytes, need at least {}",
            sealed.len(),
            SALT_LEN + NONCE_LEN + TAG_LEN
        ))
    };
    let (salt, rest) = sealed.split_first_chunk::<SALT_LEN>().ok_or_else(too_short)?;
    let (nonce, body) = rest.split_first_chunk::<NONCE_LEN>().ok_or_else(too_short)?;
    if body.len() < TAG_LEN {
        return Err(too_short());
    }

    cipher_for(password, salt)
        .map_err(WalletError::Decryption)?
        .decrypt(Nonce::from_slice(nonce), body)
        .map_err(|_| WalletError::InvalidPassword)
}
