//! secp256k1 cryptographic operations.
//!
//! Provides key generation, WIF import/export, transaction input signing
//! and signed-message authentication. Uses the `secp256k1` crate for the
//! curve arithmetic and `sha2`/`ripemd` for hashing.
//!
//! # Signing scheme
//!
//! Transaction inputs are signed with `SIGHASH_ALL | SIGHASH_FORKID`. The
//! digest is the double SHA-256 of a preimage committing to:
//! - version and lock time
//! - every input outpoint and sequence (as two sub-hashes)
//! - the outpoint, locking script and value of the input being signed
//! - every output (as one sub-hash)
//!
//! Nonces are RFC 6979 deterministic, so the same key and transaction
//! always produce the same signature.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ripemd::Ripemd160;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use secp256k1::{All, Message, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::OnceLock;
use zeroize::Zeroize;

use crate::address::{Address, Network};
use crate::constants::{MESSAGE_MAGIC, SIGHASH_ALL_FORKID};
use crate::error::CryptoError;
use crate::script::Script;
use crate::types::{Transaction, write_varint};

fn secp() -> &'static Secp256k1<All> {
    static SECP: OnceLock<Secp256k1<All>> = OnceLock::new();
    SECP.get_or_init(Secp256k1::new)
}

/// Single SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Double SHA-256, used for txids, sighashes and message digests.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// RIPEMD-160 of SHA-256, used for public key hashes.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

/// secp256k1 keypair for signing transactions and messages.
///
/// Carries the compression flag recovered from its WIF encoding so the
/// derived address matches the one other wallets compute for the same key.
pub struct KeyPair {
    secret: SecretKey,
    compressed: bool,
}

impl KeyPair {
    /// Generate a random keypair from the OS cryptographic RNG.
    ///
    /// Fails only if the entropy source fails.
    pub fn generate() -> Result<Self, CryptoError> {
        use rand::RngCore;
        let mut bytes = [0u8; 32];
        loop {
            rand::rngs::OsRng
                .try_fill_bytes(&mut bytes)
                .map_err(|e| CryptoError::Entropy(e.to_string()))?;
            // Out-of-range scalars are astronomically rare; draw again.
            if let Ok(secret) = SecretKey::from_slice(&bytes) {
                bytes.zeroize();
                return Ok(Self {
                    secret,
                    compressed: true,
                });
            }
        }
    }

    /// Create a compressed keypair from 32-byte secret key material.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidSecretKey)?;
        Ok(Self {
            secret,
            compressed: true,
        })
    }

    /// Decode a WIF private key. Returns the key and the network it encodes.
    pub fn from_wif(wif: &str) -> Result<(Self, Network), CryptoError> {
        let mut payload = bs58::decode(wif.trim())
            .with_check(None)
            .into_vec()
            .map_err(|e| CryptoError::InvalidWif(e.to_string()))?;

        let compressed = match payload.len() {
            33 => false,
            34 if payload[33] == 0x01 => true,
            34 => {
                payload.zeroize();
                return Err(CryptoError::InvalidWif("bad compression flag".into()));
            }
            n => {
                payload.zeroize();
                return Err(CryptoError::InvalidWif(format!("unexpected length {n}")));
            }
        };

        let Some(network) = Network::from_wif_version(payload[0]) else {
            let version = payload[0];
            payload.zeroize();
            return Err(CryptoError::InvalidWif(format!(
                "unknown version byte {version:#04x}"
            )));
        };

        let secret = SecretKey::from_slice(&payload[1..33]);
        payload.zeroize();
        let secret = secret.map_err(|_| CryptoError::InvalidSecretKey)?;

        Ok((Self { secret, compressed }, network))
    }

    /// Encode as WIF for the given network.
    pub fn to_wif(&self, network: Network) -> String {
        let mut payload = Vec::with_capacity(34);
        payload.push(network.wif_version());
        payload.extend_from_slice(&self.secret.secret_bytes());
        if self.compressed {
            payload.push(0x01);
        }
        let wif = bs58::encode(&payload).with_check().into_string();
        payload.zeroize();
        wif
    }

    /// Derive the public key from this keypair.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            inner: secp256k1::PublicKey::from_secret_key(secp(), &self.secret),
            compressed: self.compressed,
        }
    }

    /// The P2PKH address of this keypair on `network`.
    pub fn address(&self, network: Network) -> Address {
        Address::from_public_key(&self.public_key(), network)
    }

    /// Whether the public key serialises in compressed form.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Sign a 32-byte digest, returning a DER-encoded low-S signature.
    pub fn sign_digest(&self, digest: [u8; 32]) -> Vec<u8> {
        let msg = Message::from_digest(digest);
        secp().sign_ecdsa(&msg, &self.secret).serialize_der().to_vec()
    }

    /// Sign an arbitrary message with the signed-message convention.
    ///
    /// Returns the base64 encoding of the 65-byte compact recoverable
    /// signature (header byte + r + s).
    pub fn sign_message(&self, message: &[u8]) -> String {
        let msg = Message::from_digest(message_digest(message));
        let sig = secp().sign_ecdsa_recoverable(&msg, &self.secret);
        let (rec_id, bytes) = sig.serialize_compact();
        let mut out = [0u8; 65];
        out[0] = 27u8
            .saturating_add(rec_id.to_i32() as u8)
            .saturating_add(if self.compressed { 4 } else { 0 });
        out[1..].copy_from_slice(&bytes);
        BASE64.encode(out)
    }
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        Self {
            secret: self.secret,
            compressed: self.compressed,
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// secp256k1 public key for verifying signatures and deriving addresses.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    inner: secp256k1::PublicKey,
    compressed: bool,
}

impl PublicKey {
    /// Parse a 33-byte compressed or 65-byte uncompressed public key.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let inner =
            secp256k1::PublicKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self {
            inner,
            compressed: bytes.len() == 33,
        })
    }

    /// Serialized key bytes in the key's own compression form.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.compressed {
            self.inner.serialize().to_vec()
        } else {
            self.inner.serialize_uncompressed().to_vec()
        }
    }

    /// HASH160 of the serialized key, as embedded in P2PKH scripts.
    pub fn pubkey_hash(&self) -> [u8; 20] {
        hash160(&self.to_bytes())
    }

    /// Verify a DER signature over a 32-byte digest.
    pub fn verify_digest(&self, digest: [u8; 32], der: &[u8]) -> Result<(), CryptoError> {
        let sig = Signature::from_der(der).map_err(|_| CryptoError::InvalidSignature)?;
        let msg = Message::from_digest(digest);
        secp()
            .verify_ecdsa(&msg, &sig, &self.inner)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.to_bytes()))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

/// Digest signed by [`KeyPair::sign_message`]:
/// `sha256d(varint(len(magic)) || magic || varint(len(msg)) || msg)`.
pub fn message_digest(message: &[u8]) -> [u8; 32] {
    let mut data = Vec::with_capacity(MESSAGE_MAGIC.len() + message.len() + 10);
    write_varint(&mut data, MESSAGE_MAGIC.len() as u64);
    data.extend_from_slice(MESSAGE_MAGIC.as_bytes());
    write_varint(&mut data, message.len() as u64);
    data.extend_from_slice(message);
    sha256d(&data)
}

/// Verify a base64 signed-message signature against a P2PKH address.
///
/// Recovers the signing key from the compact signature and checks that
/// its HASH160 matches the address.
pub fn verify_message(
    address: &Address,
    message: &[u8],
    signature_b64: &str,
) -> Result<(), CryptoError> {
    let raw = BASE64
        .decode(signature_b64.trim())
        .map_err(|_| CryptoError::InvalidSignature)?;
    if raw.len() != 65 || !(27..=34).contains(&raw[0]) {
        return Err(CryptoError::InvalidSignature);
    }

    let header = raw[0] - 27;
    let compressed = header >= 4;
    let rec_id =
        RecoveryId::from_i32(i32::from(header & 3)).map_err(|_| CryptoError::InvalidSignature)?;
    let sig = RecoverableSignature::from_compact(&raw[1..], rec_id)
        .map_err(|_| CryptoError::InvalidSignature)?;

    let msg = Message::from_digest(message_digest(message));
    let recovered = secp()
        .recover_ecdsa(&msg, &sig)
        .map_err(|_| CryptoError::VerificationFailed)?;

    let key = PublicKey {
        inner: recovered,
        compressed,
    };
    if key.pubkey_hash() == address.pubkey_hash() {
        Ok(())
    } else {
        Err(CryptoError::VerificationFailed)
    }
}

/// Compute the `SIGHASH_ALL | SIGHASH_FORKID` digest for one input.
///
/// `prev_script` and `prev_value` describe the output being spent.
pub fn signing_hash(
    tx: &Transaction,
    input_index: usize,
    prev_script: &Script,
    prev_value: u64,
) -> Result<[u8; 32], CryptoError> {
    let input = tx
        .inputs
        .get(input_index)
        .ok_or(CryptoError::InputIndexOutOfBounds {
            index: input_index,
            len: tx.inputs.len(),
        })?;

    let mut prevouts = Vec::with_capacity(tx.inputs.len() * 36);
    let mut sequences = Vec::with_capacity(tx.inputs.len() * 4);
    for txin in &tx.inputs {
        txin.previous_output.write_to(&mut prevouts);
        sequences.extend_from_slice(&txin.sequence.to_le_bytes());
    }

    let mut outputs = Vec::new();
    for txout in &tx.outputs {
        txout.write_to(&mut outputs);
    }

    let mut preimage = Vec::with_capacity(156 + prev_script.len());
    preimage.extend_from_slice(&tx.version.to_le_bytes());
    preimage.extend_from_slice(&sha256d(&prevouts));
    preimage.extend_from_slice(&sha256d(&sequences));
    input.previous_output.write_to(&mut preimage);
    write_varint(&mut preimage, prev_script.len() as u64);
    preimage.extend_from_slice(prev_script.as_bytes());
    preimage.extend_from_slice(&prev_value.to_le_bytes());
    preimage.extend_from_slice(&input.sequence.to_le_bytes());
    preimage.extend_from_slice(&sha256d(&outputs));
    preimage.extend_from_slice(&tx.lock_time.to_le_bytes());
    preimage.extend_from_slice(&SIGHASH_ALL_FORKID.to_le_bytes());

    Ok(sha256d(&preimage))
}

/// Sign a P2PKH input in place, writing `<sig||type> <pubkey>` as its unlocking script.
pub fn sign_transaction_input(
    tx: &mut Transaction,
    input_index: usize,
    keypair: &KeyPair,
    prev_script: &Script,
    prev_value: u64,
) -> Result<(), CryptoError> {
    let digest = signing_hash(tx, input_index, prev_script, prev_value)?;
    let mut sig = keypair.sign_digest(digest);
    sig.push(SIGHASH_ALL_FORKID as u8);

    let mut script_sig = Script::new();
    script_sig.push_data(&sig);
    script_sig.push_data(&keypair.public_key().to_bytes());
    tx.inputs[input_index].script_sig = script_sig;
    Ok(())
}

/// Verify a P2PKH input signed by [`sign_transaction_input`].
pub fn verify_transaction_input(
    tx: &Transaction,
    input_index: usize,
    prev_script: &Script,
    prev_value: u64,
) -> Result<(), CryptoError> {
    let input = tx
        .inputs
        .get(input_index)
        .ok_or(CryptoError::InputIndexOutOfBounds {
            index: input_index,
            len: tx.inputs.len(),
        })?;

    let pushes = input
        .script_sig
        .pushes()
        .map_err(|_| CryptoError::InvalidSignature)?;
    let [sig, pubkey] = pushes.as_slice() else {
        return Err(CryptoError::InvalidSignature);
    };
    let Some((&sighash_type, der)) = sig.split_last() else {
        return Err(CryptoError::InvalidSignature);
    };
    if u32::from(sighash_type) != SIGHASH_ALL_FORKID {
        return Err(CryptoError::InvalidSignature);
    }

    let key = PublicKey::from_slice(pubkey)?;
    if Some(key.pubkey_hash()) != prev_script.p2pkh_hash() {
        return Err(CryptoError::VerificationFailed);
    }

    let digest = signing_hash(tx, input_index, prev_script, prev_value)?;
    key.verify_digest(digest, der)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutPoint, TxIn, TxOut, Txid};

    fn one() -> KeyPair {
        let mut secret = [0u8; 32];
        secret[31] = 1;
        KeyPair::from_secret_bytes(secret).unwrap()
    }

    fn sample_tx(kp: &KeyPair) -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![
                TxIn::unsigned(OutPoint::new(Txid::from_bytes([0x11; 32]), 0)),
                TxIn::unsigned(OutPoint::new(Txid::from_bytes([0x22; 32]), 3)),
            ],
            outputs: vec![TxOut {
                value: 900,
                script_pubkey: kp.address(Network::Mainnet).script_pubkey(),
            }],
            lock_time: 0,
        }
    }

    #[test]
    fn hash160_of_empty() {
        assert_eq!(
            hex::encode(hash160(b"")),
            "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb"
        );
    }

    #[test]
    fn generate_produces_distinct_keys() {
        let a = KeyPair::generate().unwrap();
        let b = KeyPair::generate().unwrap();
        assert_ne!(a.public_key(), b.public_key());
        assert!(a.is_compressed());
    }

    #[test]
    fn wif_known_vector() {
        let kp = one();
        let wif = kp.to_wif(Network::Mainnet);
        assert_eq!(wif, "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn");
        let (back, net) = KeyPair::from_wif(&wif).unwrap();
        assert_eq!(net, Network::Mainnet);
        assert_eq!(back.public_key(), kp.public_key());
    }

    #[test]
    fn uncompressed_wif_keeps_flag() {
        let (kp, _) =
            KeyPair::from_wif("5HpHagT65TZzG1PH3CSu63k8DbpvD8s5ip4nEB3kEsreAnchuDf").unwrap();
        assert!(!kp.is_compressed());
        assert_eq!(
            kp.address(Network::Mainnet).encode(),
            "1EHNa6Q4Jz2uvNExL497mE43ikXhwF6kZm"
        );
    }

    #[test]
    fn wif_rejects_garbage() {
        assert!(matches!(
            KeyPair::from_wif("not-a-key"),
            Err(CryptoError::InvalidWif(_))
        ));
        // Valid base58check, wrong version.
        let mut payload = vec![0x42u8];
        payload.extend_from_slice(&[1u8; 32]);
        payload.push(1);
        let s = bs58::encode(payload).with_check().into_string();
        assert!(matches!(KeyPair::from_wif(&s), Err(CryptoError::InvalidWif(_))));
    }

    #[test]
    fn wif_rejects_zero_scalar() {
        let mut payload = vec![0x80u8];
        payload.extend_from_slice(&[0u8; 32]);
        payload.push(1);
        let s = bs58::encode(payload).with_check().into_string();
        assert!(matches!(
            KeyPair::from_wif(&s),
            Err(CryptoError::InvalidSecretKey)
        ));
    }

    #[test]
    fn message_signature_is_deterministic_and_verifies() {
        let kp = one();
        let addr = kp.address(Network::Mainnet);
        let a = kp.sign_message(b"hello world");
        let b = kp.sign_message(b"hello world");
        assert_eq!(a, b);
        verify_message(&addr, b"hello world", &a).unwrap();
    }

    #[test]
    fn message_signature_rejects_tampering() {
        let kp = one();
        let addr = kp.address(Network::Mainnet);
        let sig = kp.sign_message(b"hello world");
        assert_eq!(
            verify_message(&addr, b"hello world!", &sig),
            Err(CryptoError::VerificationFailed)
        );
        let other = KeyPair::from_secret_bytes([9u8; 32]).unwrap();
        assert_eq!(
            verify_message(&other.address(Network::Mainnet), b"hello world", &sig),
            Err(CryptoError::VerificationFailed)
        );
        assert_eq!(
            verify_message(&addr, b"hello world", "AAAA"),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn sign_and_verify_inputs() {
        let kp = one();
        let prev = kp.address(Network::Mainnet).script_pubkey();
        let mut tx = sample_tx(&kp);
        sign_transaction_input(&mut tx, 0, &kp, &prev, 500).unwrap();
        sign_transaction_input(&mut tx, 1, &kp, &prev, 600).unwrap();
        verify_transaction_input(&tx, 0, &prev, 500).unwrap();
        verify_transaction_input(&tx, 1, &prev, 600).unwrap();
    }

    #[test]
    fn verify_fails_on_wrong_value() {
        let kp = one();
        let prev = kp.address(Network::Mainnet).script_pubkey();
        let mut tx = sample_tx(&kp);
        sign_transaction_input(&mut tx, 0, &kp, &prev, 500).unwrap();
        assert_eq!(
            verify_transaction_input(&tx, 0, &prev, 501),
            Err(CryptoError::VerificationFailed)
        );
    }

    #[test]
    fn input_signature_is_deterministic() {
        let kp = one();
        let prev = kp.address(Network::Mainnet).script_pubkey();
        let mut a = sample_tx(&kp);
        let mut b = sample_tx(&kp);
        sign_transaction_input(&mut a, 0, &kp, &prev, 500).unwrap();
        sign_transaction_input(&mut b, 0, &kp, &prev, 500).unwrap();
        assert_eq!(a.inputs[0].script_sig, b.inputs[0].script_sig);
    }

    #[test]
    fn signing_hash_index_out_of_bounds() {
        let kp = one();
        let prev = kp.address(Network::Mainnet).script_pubkey();
        let tx = sample_tx(&kp);
        assert_eq!(
            signing_hash(&tx, 5, &prev, 1),
            Err(CryptoError::InputIndexOutOfBounds { index: 5, len: 2 })
        );
    }

    #[test]
    fn keypair_debug_hides_secret() {
        let kp = one();
        let debug = format!("{kp:?}");
        assert!(debug.contains("public_key"));
        assert!(!debug.contains("secret"));
    }
}
