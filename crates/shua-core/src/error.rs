//! Error types for the Shua primitives.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid secret key bytes")] InvalidSecretKey,
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("invalid signature bytes")] InvalidSignature,
    #[error("signature verification failed")] VerificationFailed,
    #[error("invalid WIF: {0}")] InvalidWif(String),
    #[error("entropy source failure: {0}")] Entropy(String),
    #[error("input index out of bounds: {index} >= {len}")] InputIndexOutOfBounds { index: usize, len: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid base58: {0}")] InvalidBase58(String),
    #[error("invalid length: {0}")] InvalidLength(usize),
    #[error("unknown version byte: {0:#04x}")] UnknownVersion(u8),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("truncated script at offset {0}")] Truncated(usize),
    #[error("not a data output script")] NotDataOutput,
    #[error("unexpected opcode {0:#04x} in push-only script")] UnexpectedOpcode(u8),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("invalid txid: {0}")] InvalidTxid(String),
    #[error("decode: {0}")] Decode(String),
    #[error("value overflow")] ValueOverflow,
    #[error("empty outputs")] EmptyOutputs,
    #[error(transparent)] Crypto(#[from] CryptoError),
    #[error(transparent)] Script(#[from] ScriptError),
}
