//! Protocol markers and the token sequence type.

use std::fmt;

use shua_core::script::Script;

/// Opens a content group (`B`).
pub const B_PROTOCOL_ADDRESS: &str = "19HxigV4QyBv3tHpQVcUEQyq1pzZVdoAut";
/// Opens the metadata group (`MAP`).
pub const MAP_PROTOCOL_ADDRESS: &str = "1PuQa7K62MiKCtssSLKy1kh56WWU7MtUR5";
/// Opens the identity-proof trailer (`AIP`).
pub const AIP_PROTOCOL_ADDRESS: &str = "15PciHG22SNLQJXMoSUaWVi7WSqc7hCfva";

pub const SEPARATOR: &str = "|";
pub const MAP_SET: &str = "SET";
pub const TEXT_ENCODING: &str = "UTF-8";
pub const DEFAULT_TEXT_TYPE: &str = "text/markdown";
pub const SIGNING_ALGORITHM: &str = "BITCOIN_ECDSA";

/// How [`Ops::render`] turns tokens into strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Hex,
    Utf8,
}

/// Which record an [`Ops`] sequence encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Post,
    Reply,
    Repost,
    Like,
    Tip,
    Follow,
    Unfollow,
}

impl OperationKind {
    /// The value of the `type` metadata pair.
    pub fn type_name(&self) -> &'static str {
        match self {
            OperationKind::Post | OperationKind::Reply => "post",
            OperationKind::Repost => "repost",
            OperationKind::Like => "like",
            OperationKind::Tip => "tip",
            OperationKind::Follow => "follow",
            OperationKind::Unfollow => "unfollow",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// An encoded token sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ops {
    kind: OperationKind,
    tokens: Vec<Vec<u8>>,
}

impl Ops {
    /// Wrap tokens read back from a data output.
    pub fn from_tokens(kind: OperationKind, tokens: Vec<Vec<u8>>) -> Self {
        Self { kind, tokens }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn tokens(&self) -> &[Vec<u8>] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<Vec<u8>> {
        self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// String view of every token.
    ///
    /// `Utf8` is lossy for binary tokens such as image bytes.
    pub fn render(&self, encoding: Encoding) -> Vec<String> {
        self.tokens
            .iter()
            .map(|t| match encoding {
                Encoding::Hex => hex::encode(t),
                Encoding::Utf8 => String::from_utf8_lossy(t).into_owned(),
            })
            .collect()
    }

    /// The `OP_FALSE OP_RETURN` output script carrying these tokens.
    pub fn data_script(&self) -> Script {
        Script::data_output(&self.tokens)
    }

    pub(crate) fn with_tokens(&self, tokens: Vec<Vec<u8>>) -> Self {
        Self {
            kind: self.kind,
            tokens,
        }
    }
}

/// Token builder shared by the encoders.
#[derive(Default)]
pub(crate) struct TokenWriter {
    tokens: Vec<Vec<u8>>,
}

impl TokenWriter {
    pub(crate) fn push(&mut self, token: impl AsRef<[u8]>) -> &mut Self {
        self.tokens.push(token.as_ref().to_vec());
        self
    }

    pub(crate) fn pair(&mut self, key: &str, value: impl AsRef<[u8]>) -> &mut Self {
        self.push(key).push(value)
    }

    pub(crate) fn finish(self) -> Vec<Vec<u8>> {
        self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Ops {
        Ops::from_tokens(
            OperationKind::Post,
            vec![b"hi".to_vec(), vec![0xff, 0x00]],
        )
    }

    #[test]
    fn render_hex_is_default() {
        assert_eq!(Encoding::default(), Encoding::Hex);
        assert_eq!(sample().render(Encoding::Hex), vec!["6869", "ff00"]);
    }

    #[test]
    fn render_utf8_is_lossy_for_binary() {
        let rendered = sample().render(Encoding::Utf8);
        assert_eq!(rendered[0], "hi");
        assert!(rendered[1].contains('\u{FFFD}'));
    }

    #[test]
    fn data_script_recovers_tokens() {
        let ops = sample();
        let script = ops.data_script();
        assert!(script.is_data_output());
        assert_eq!(script.data_pushes().unwrap(), ops.tokens());
    }

    #[test]
    fn markers_are_valid_addresses() {
        for marker in [B_PROTOCOL_ADDRESS, MAP_PROTOCOL_ADDRESS, AIP_PROTOCOL_ADDRESS] {
            assert!(shua_core::address::Address::decode(marker).is_ok(), "{marker}");
        }
    }
}
