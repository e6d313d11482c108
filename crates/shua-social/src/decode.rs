//! Read a token sequence back into its groups by marker.

use crate::error::SocialError;
use crate::protocol::{
    AIP_PROTOCOL_ADDRESS, B_PROTOCOL_ADDRESS, MAP_PROTOCOL_ADDRESS, MAP_SET, SEPARATOR,
};

/// One `B` group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentGroup {
    pub data: Vec<u8>,
    pub media_type: String,
    /// Present for text content.
    pub encoding: Option<String>,
}

impl ContentGroup {
    /// The content as text, if it was encoded as text.
    pub fn text(&self) -> Option<&str> {
        self.encoding
            .as_ref()
            .and_then(|_| std::str::from_utf8(&self.data).ok())
    }
}

/// The `AIP` trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProof {
    pub algorithm: String,
    pub address: String,
    pub signature: String,
    /// Number of leading tokens covered by the signature.
    pub signed_len: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedOps {
    pub contents: Vec<ContentGroup>,
    /// `MAP SET` pairs in order.
    pub metadata: Vec<(String, String)>,
    pub proof: Option<IdentityProof>,
}

impl DecodedOps {
    /// First value for `key` in the metadata group.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

struct Cursor<'a> {
    tokens: &'a [Vec<u8>],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&'a [u8]> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a [u8]> {
        self.tokens.get(self.pos + offset).map(Vec::as_slice)
    }

    /// Whether the cursor sits on `| <AIP marker>`.
    fn at_proof(&self) -> bool {
        self.peek() == Some(SEPARATOR.as_bytes())
            && self.peek_at(1) == Some(AIP_PROTOCOL_ADDRESS.as_bytes())
    }

    fn next(&mut self, what: &str) -> Result<&'a [u8], SocialError> {
        let token = self
            .peek()
            .ok_or_else(|| SocialError::Malformed(format!("missing {what} at token {}", self.pos)))?;
        self.pos += 1;
        Ok(token)
    }

    fn next_string(&mut self, what: &str) -> Result<String, SocialError> {
        self.next(what)
            .map(|t| String::from_utf8_lossy(t).into_owned())
    }

    fn expect_literal(&mut self, literal: &str) -> Result<(), SocialError> {
        let token = self.next(literal)?;
        if token != literal.as_bytes() {
            return Err(SocialError::Malformed(format!(
                "expected {literal:?} at token {}",
                self.pos - 1
            )));
        }
        Ok(())
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

/// Split `tokens` into content groups, metadata pairs and identity proof.
pub fn decode(tokens: &[Vec<u8>]) -> Result<DecodedOps, SocialError> {
    let mut cursor = Cursor { tokens, pos: 0 };
    let mut decoded = DecodedOps::default();

    while !cursor.at_end() {
        let start = cursor.pos;
        let marker = cursor.next("marker")?;

        if marker == B_PROTOCOL_ADDRESS.as_bytes() {
            let data = cursor.next("content")?.to_vec();
            let media_type = cursor.next_string("media type")?;
            let encoding = if cursor.peek() == Some(SEPARATOR.as_bytes()) {
                None
            } else {
                Some(cursor.next_string("encoding")?)
            };
            cursor.expect_literal(SEPARATOR)?;
            decoded.contents.push(ContentGroup {
                data,
                media_type,
                encoding,
            });
        } else if marker == MAP_PROTOCOL_ADDRESS.as_bytes() {
            cursor.expect_literal(MAP_SET)?;
            while !cursor.at_end() && !cursor.at_proof() {
                let key = cursor.next_string("metadata key")?;
                let value = cursor.next_string("metadata value")?;
                decoded.metadata.push((key, value));
            }
        } else if marker == SEPARATOR.as_bytes() || marker == AIP_PROTOCOL_ADDRESS.as_bytes() {
            if marker == SEPARATOR.as_bytes() {
                cursor.expect_literal(AIP_PROTOCOL_ADDRESS)?;
            }
            decoded.proof = Some(IdentityProof {
                algorithm: cursor.next_string("signing algorithm")?,
                address: cursor.next_string("signer address")?,
                signature: cursor.next_string("signature")?,
                signed_len: start,
            });
            if !cursor.at_end() {
                return Err(SocialError::Malformed(
                    "tokens after identity proof".into(),
                ));
            }
        } else {
            return Err(SocialError::Malformed(format!(
                "unknown marker at token {start}"
            )));
        }
    }

    Ok(decoded)
}
