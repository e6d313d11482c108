//! Locking and unlocking scripts.
//!
//! Only two output shapes are produced: pay-to-public-key-hash and the
//! unspendable data carrier `OP_FALSE OP_RETURN <push>...`. Pushes use
//! the shortest direct or `OP_PUSHDATAn` encoding for their length.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::ScriptError;

pub const OP_FALSE: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;

/// Raw script bytes.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        hex::decode(s.trim()).map(Self)
    }

    /// `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`
    pub fn p2pkh(pubkey_hash: &[u8; 20]) -> Self {
        let mut s = Vec::with_capacity(25);
        s.extend_from_slice(&[OP_DUP, OP_HASH160, 20]);
        s.extend_from_slice(pubkey_hash);
        s.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        Self(s)
    }

    /// `OP_FALSE OP_RETURN` followed by one push per token.
    pub fn data_output(tokens: &[Vec<u8>]) -> Self {
        let mut script = Self(vec![OP_FALSE, OP_RETURN]);
        for token in tokens {
            script.push_data(token);
        }
        script
    }

    /// Append a data push using the minimal length prefix.
    pub fn push_data(&mut self, data: &[u8]) {
        let len = data.len();
        match len {
            0..=0x4b => self.0.push(len as u8),
            0x4c..=0xff => {
                self.0.push(OP_PUSHDATA1);
                self.0.push(len as u8);
            }
            0x100..=0xffff => {
                self.0.push(OP_PUSHDATA2);
                self.0.extend_from_slice(&(len as u16).to_le_bytes());
            }
            _ => {
                self.0.push(OP_PUSHDATA4);
                self.0.extend_from_slice(&(len as u32).to_le_bytes());
            }
        }
        self.0.extend_from_slice(data);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// The public key hash if this is a P2PKH locking script.
    pub fn p2pkh_hash(&self) -> Option<[u8; 20]> {
        match self.0.as_slice() {
            [OP_DUP, OP_HASH160, 20, hash @ .., OP_EQUALVERIFY, OP_CHECKSIG] if hash.len() == 20 => {
                let mut out = [0u8; 20];
                out.copy_from_slice(hash);
                Some(out)
            }
            _ => None,
        }
    }

    /// Whether this is an `OP_FALSE OP_RETURN` data carrier.
    pub fn is_data_output(&self) -> bool {
        self.0.starts_with(&[OP_FALSE, OP_RETURN])
    }

    /// The pushed tokens of a data carrier, in order.
    pub fn data_pushes(&self) -> Result<Vec<Vec<u8>>, ScriptError> {
        if !self.is_data_output() {
            return Err(ScriptError::NotDataOutput);
        }
        parse_pushes(&self.0, 2)
    }

    /// Every push in a push-only script (such as an unlocking script).
    pub fn pushes(&self) -> Result<Vec<Vec<u8>>, ScriptError> {
        parse_pushes(&self.0, 0)
    }
}

fn parse_pushes(bytes: &[u8], start: usize) -> Result<Vec<Vec<u8>>, ScriptError> {
    let mut pushes = Vec::new();
    let mut pos = start;
    while pos < bytes.len() {
        let op = bytes[pos];
        pos += 1;
        let (len, width) = match op {
            0x00..=0x4b => (op as usize, 0),
            OP_PUSHDATA1 => (read_len(bytes, pos, 1)?, 1),
            OP_PUSHDATA2 => (read_len(bytes, pos, 2)?, 2),
            OP_PUSHDATA4 => (read_len(bytes, pos, 4)?, 4),
            other => return Err(ScriptError::UnexpectedOpcode(other)),
        };
        pos += width;
        let end = pos
            .checked_add(len)
            .filter(|&end| end <= bytes.len())
            .ok_or(ScriptError::Truncated(pos))?;
        pushes.push(bytes[pos..end].to_vec());
        pos = end;
    }
    Ok(pushes)
}

fn read_len(bytes: &[u8], pos: usize, width: usize) -> Result<usize, ScriptError> {
    let field = bytes
        .get(pos..pos + width)
        .ok_or(ScriptError::Truncated(pos))?;
    let mut le = [0u8; 4];
    le[..width].copy_from_slice(field);
    Ok(u32::from_le_bytes(le) as usize)
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Script {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Script {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn p2pkh_layout() {
        let s = Script::p2pkh(&[0xaa; 20]);
        assert_eq!(s.len(), 25);
        assert_eq!(
            s.to_hex(),
            format!("76a914{}88ac", "aa".repeat(20))
        );
        assert_eq!(s.p2pkh_hash(), Some([0xaa; 20]));
    }

    #[test]
    fn p2pkh_hash_rejects_other_shapes() {
        assert_eq!(Script::new().p2pkh_hash(), None);
        assert_eq!(Script::data_output(&[vec![1]]).p2pkh_hash(), None);
    }

    #[test]
    fn push_prefix_widths() {
        let mut s = Script::new();
        s.push_data(&[]);
        assert_eq!(s.as_bytes(), &[0x00]);

        let mut s = Script::new();
        s.push_data(&[7; 75]);
        assert_eq!(s.as_bytes()[0], 75);

        let mut s = Script::new();
        s.push_data(&[7; 76]);
        assert_eq!(&s.as_bytes()[..2], &[OP_PUSHDATA1, 76]);

        let mut s = Script::new();
        s.push_data(&[7; 256]);
        assert_eq!(&s.as_bytes()[..3], &[OP_PUSHDATA2, 0x00, 0x01]);

        let mut s = Script::new();
        s.push_data(&vec![7; 0x1_0000]);
        assert_eq!(&s.as_bytes()[..5], &[OP_PUSHDATA4, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn data_output_starts_with_false_return() {
        let s = Script::data_output(&[b"a".to_vec(), b"bc".to_vec()]);
        assert_eq!(s.as_bytes(), &[OP_FALSE, OP_RETURN, 1, b'a', 2, b'b', b'c']);
        assert!(s.is_data_output());
    }

    #[test]
    fn data_pushes_rejects_non_data() {
        assert_eq!(
            Script::p2pkh(&[0; 20]).data_pushes(),
            Err(ScriptError::NotDataOutput)
        );
    }

    #[test]
    fn truncated_push_rejected() {
        let s = Script::from_bytes(vec![OP_FALSE, OP_RETURN, 5, 1, 2]);
        assert!(matches!(s.data_pushes(), Err(ScriptError::Truncated(_))));
    }

    #[test]
    fn serde_hex() {
        let s = Script::p2pkh(&[1; 20]);
        let json = serde_json::to_string(&s).unwrap();
        let back: Script = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    proptest! {
        #[test]
        fn data_pushes_recover_tokens(
            tokens in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..400), 0..8)
        ) {
            let s = Script::data_output(&tokens);
            prop_assert_eq!(s.data_pushes().unwrap(), tokens);
        }
    }
}
