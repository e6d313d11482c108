//! Identity proof: binding a token sequence to a signing key.
//!
//! The signed message is the byte layout the tokens take once embedded:
//! `OP_RETURN` followed by the concatenated token bytes. Likes are signed
//! over `OP_RETURN OP_RETURN <tokens> OP_SWAP` instead, and verifiers
//! depend on that layout.

use shua_core::address::{Address, Network};
use shua_core::crypto::{KeyPair, verify_message};
use shua_core::script::OP_RETURN;

use crate::decode::decode;
use crate::error::SocialError;
use crate::protocol::{AIP_PROTOCOL_ADDRESS, OperationKind, Ops, SEPARATOR, SIGNING_ALGORITHM};

const OP_SWAP: u8 = 0x7c;

/// The exact bytes covered by an identity signature over `tokens`.
pub fn signing_message(tokens: &[Vec<u8>], is_like: bool) -> Vec<u8> {
    let body: usize = tokens.iter().map(Vec::len).sum();
    let mut message = Vec::with_capacity(body + 3);
    message.push(OP_RETURN);
    if is_like {
        message.push(OP_RETURN);
    }
    for token in tokens {
        message.extend_from_slice(token);
    }
    if is_like {
        message.push(OP_SWAP);
    }
    message
}

/// Append an identity proof signed by `identity_key`.
///
/// Without a key the sequence is returned unchanged.
pub fn sign(ops: &Ops, identity_key: Option<&KeyPair>, network: Network) -> Ops {
    let Some(key) = identity_key else {
        return ops.clone();
    };

    let message = signing_message(ops.tokens(), ops.kind() == OperationKind::Like);
    let signature = key.sign_message(&message);
    let address = key.address(network);

    let mut tokens = ops.tokens().to_vec();
    tokens.extend([
        SEPARATOR.as_bytes().to_vec(),
        AIP_PROTOCOL_ADDRESS.as_bytes().to_vec(),
        SIGNING_ALGORITHM.as_bytes().to_vec(),
        address.encode().into_bytes(),
        signature.into_bytes(),
    ]);
    tracing::debug!(%address, kind = %ops.kind(), "signed social payload");
    ops.with_tokens(tokens)
}

/// Check the identity proof of a signed token sequence.
///
/// Returns the signer's address. Whether the record is a like is read from
/// its `type` metadata pair.
pub fn verify(tokens: &[Vec<u8>]) -> Result<Address, SocialError> {
    let decoded = decode(tokens)?;
    let proof = decoded
        .proof
        .as_ref()
        .ok_or_else(|| SocialError::Signing("payload carries no identity proof".into()))?;
    if proof.algorithm != SIGNING_ALGORITHM {
        return Err(SocialError::Signing(format!(
            "unsupported algorithm {}",
            proof.algorithm
        )));
    }

    let address = Address::decode(&proof.address)
        .map_err(|e| SocialError::Signing(format!("signer address: {e}")))?;
    let is_like = decoded.metadata_value("type") == Some(OperationKind::Like.type_name());
    let message = signing_message(&tokens[..proof.signed_len], is_like);
    verify_message(&address, &message, &proof.signature)
        .map_err(|e| SocialError::Signing(e.to_string()))?;
    Ok(address)
}
