//! Social operations and their token encodings.

use regex::Regex;
use std::sync::LazyLock;

use crate::content::PostContent;
use crate::error::SocialError;
use crate::protocol::{
    B_PROTOCOL_ADDRESS, MAP_PROTOCOL_ADDRESS, MAP_SET, OperationKind, Ops, SEPARATOR,
    TEXT_ENCODING, TokenWriter,
};

/// One emoji grapheme: a flag pair, a keycap sequence, or a pictographic
/// emoji with optional presentation selector or skin tone, optionally joined
/// to more by ZWJ. Bare ASCII digits, `#` and `*` are not emoji.
const EMOJI_PATTERN: &str = r"^(?:\p{Regional_Indicator}{2}|[0-9#*]\x{FE0F}?\x{20E3}|\p{Extended_Pictographic}(?:\x{FE0F}|\p{Emoji_Modifier})*(?:\x{200D}\p{Extended_Pictographic}(?:\x{FE0F}|\p{Emoji_Modifier})*)*)$";

static EMOJI: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(EMOJI_PATTERN));

fn validate_emoji(emoji: &str) -> Result<(), SocialError> {
    match &*EMOJI {
        Ok(re) if re.is_match(emoji) => Ok(()),
        _ => Err(SocialError::InvalidEmoji(emoji.to_owned())),
    }
}

/// Tip value; omitted from the record when zero or without a currency.
#[derive(Debug, Clone, PartialEq)]
pub struct TipAmount {
    pub value: f64,
    pub currency: String,
}

impl TipAmount {
    pub fn new(value: f64, currency: impl Into<String>) -> Self {
        Self {
            value,
            currency: currency.into(),
        }
    }

    fn is_present(&self) -> bool {
        self.value != 0.0 && !self.currency.is_empty()
    }
}

/// A social record.
#[derive(Debug, Clone, PartialEq)]
pub enum SocialOperation {
    Post(PostContent),
    Reply { tx_id: String, content: PostContent },
    /// Carries only the reposted txid, never content.
    Repost { tx_id: String },
    Like { tx_id: String, emoji: Option<String> },
    Tip { tx_id: String, amount: Option<TipAmount> },
    Follow { id_key: String },
    Unfollow { id_key: String },
}

impl SocialOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            SocialOperation::Post(_) => OperationKind::Post,
            SocialOperation::Reply { .. } => OperationKind::Reply,
            SocialOperation::Repost { .. } => OperationKind::Repost,
            SocialOperation::Like { .. } => OperationKind::Like,
            SocialOperation::Tip { .. } => OperationKind::Tip,
            SocialOperation::Follow { .. } => OperationKind::Follow,
            SocialOperation::Unfollow { .. } => OperationKind::Unfollow,
        }
    }

    /// Encode as an unsigned token sequence published under `app`.
    pub fn encode(&self, app: &str) -> Result<Ops, SocialError> {
        if app.is_empty() {
            return Err(SocialError::MissingAppName);
        }
        let kind = self.kind();
        let mut w = TokenWriter::default();

        match self {
            SocialOperation::Post(content) => {
                require_content(content)?;
                write_content(&mut w, content);
                write_map_header(&mut w, app, kind);
                write_map_extras(&mut w, content);
            }
            SocialOperation::Reply { tx_id, content } => {
                require_ref("reply", "transaction", tx_id)?;
                require_content(content)?;
                write_content(&mut w, content);
                write_map_header(&mut w, app, kind);
                write_tx_context(&mut w, tx_id);
                write_map_extras(&mut w, content);
            }
            SocialOperation::Repost { tx_id } => {
                require_ref("repost", "transaction", tx_id)?;
                write_map_header(&mut w, app, kind);
                w.pair("tx", tx_id);
            }
            SocialOperation::Like { tx_id, emoji } => {
                require_ref("like", "transaction", tx_id)?;
                write_map_header(&mut w, app, kind);
                write_tx_context(&mut w, tx_id);
                if let Some(emoji) = emoji.as_deref().filter(|e| !e.is_empty()) {
                    validate_emoji(emoji)?;
                    w.pair("emoji", emoji);
                }
            }
            SocialOperation::Tip { tx_id, amount } => {
                require_ref("tip", "transaction", tx_id)?;
                write_map_header(&mut w, app, kind);
                write_tx_context(&mut w, tx_id);
                if let Some(amount) = amount.as_ref().filter(|a| a.is_present()) {
                    w.pair("amount", amount.value.to_string())
                        .pair("currency", &amount.currency);
                }
            }
            SocialOperation::Follow { id_key } | SocialOperation::Unfollow { id_key } => {
                require_ref(kind.type_name(), "identity key", id_key)?;
                write_map_header(&mut w, app, kind);
                w.pair("idKey", id_key);
            }
        }

        let ops = Ops::from_tokens(kind, w.finish());
        tracing::debug!(%kind, tokens = ops.len(), "encoded social operation");
        Ok(ops)
    }
}

fn require_ref(op: &str, what: &str, value: &str) -> Result<(), SocialError> {
    if value.is_empty() {
        return Err(SocialError::EmptyContent(format!(
            "{op} is not referencing a valid {what}"
        )));
    }
    Ok(())
}

fn require_content(content: &PostContent) -> Result<(), SocialError> {
    if !content.has_content() {
        return Err(SocialError::EmptyContent(
            "there is no content for this post".into(),
        ));
    }
    Ok(())
}

fn write_content(w: &mut TokenWriter, content: &PostContent) {
    for text in content.texts() {
        w.push(B_PROTOCOL_ADDRESS)
            .push(&text.text)
            .push(&text.media_type)
            .push(TEXT_ENCODING)
            .push(SEPARATOR);
    }
    for image in content.images() {
        w.push(B_PROTOCOL_ADDRESS)
            .push(&image.data)
            .push(&image.media_type)
            .push(SEPARATOR);
    }
}

fn write_map_header(w: &mut TokenWriter, app: &str, kind: OperationKind) {
    w.push(MAP_PROTOCOL_ADDRESS)
        .push(MAP_SET)
        .pair("app", app)
        .pair("type", kind.type_name());
}

fn write_tx_context(w: &mut TokenWriter, tx_id: &str) {
    w.pair("context", "tx").pair("tx", tx_id);
}

fn write_map_extras(w: &mut TokenWriter, content: &PostContent) {
    for (key, value) in content.map_data() {
        w.pair(key, value);
    }
}

/// Factory binding operations to an app name.
#[derive(Debug, Clone)]
pub struct BSocial {
    app: String,
}

impl BSocial {
    pub fn new(app: impl Into<String>) -> Result<Self, SocialError> {
        let app = app.into();
        if app.is_empty() {
            return Err(SocialError::MissingAppName);
        }
        Ok(Self { app })
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn encode(&self, op: &SocialOperation) -> Result<Ops, SocialError> {
        op.encode(&self.app)
    }

    pub fn post(&self, content: PostContent) -> Result<Ops, SocialError> {
        self.encode(&SocialOperation::Post(content))
    }

    pub fn reply(&self, tx_id: &str, content: PostContent) -> Result<Ops, SocialError> {
        self.encode(&SocialOperation::Reply {
            tx_id: tx_id.to_owned(),
            content,
        })
    }

    pub fn repost(&self, tx_id: &str) -> Result<Ops, SocialError> {
        self.encode(&SocialOperation::Repost {
            tx_id: tx_id.to_owned(),
        })
    }

    pub fn like(&self, tx_id: &str, emoji: Option<&str>) -> Result<Ops, SocialError> {
        self.encode(&SocialOperation::Like {
            tx_id: tx_id.to_owned(),
            emoji: emoji.map(str::to_owned),
        })
    }

    /// Tip with an optional amount; the currency defaults to `USD`.
    pub fn tip(
        &self,
        tx_id: &str,
        amount: Option<f64>,
        currency: Option<&str>,
    ) -> Result<Ops, SocialError> {
        self.encode(&SocialOperation::Tip {
            tx_id: tx_id.to_owned(),
            amount: amount.map(|v| TipAmount::new(v, currency.unwrap_or("USD"))),
        })
    }

    pub fn follow(&self, id_key: &str) -> Result<Ops, SocialError> {
        self.encode(&SocialOperation::Follow {
            id_key: id_key.to_owned(),
        })
    }

    pub fn unfollow(&self, id_key: &str) -> Result<Ops, SocialError> {
        self.encode(&SocialOperation::Unfollow {
            id_key: id_key.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Encoding;

    fn social() -> BSocial {
        BSocial::new("shuallet").unwrap()
    }

    fn utf8(ops: &Ops) -> Vec<String> {
        ops.render(Encoding::Utf8)
    }

    #[test]
    fn empty_app_name_rejected() {
        assert_eq!(BSocial::new("").unwrap_err(), SocialError::MissingAppName);
        let op = SocialOperation::Follow { id_key: "k".into() };
        assert_eq!(op.encode("").unwrap_err(), SocialError::MissingAppName);
    }

    #[test]
    fn post_layout() {
        let mut content = PostContent::new();
        content.add_markdown("hello");
        content.add_map_data("paymail", "a@b.c").unwrap();
        let ops = social().post(content).unwrap();
        assert_eq!(ops.kind(), OperationKind::Post);
        assert_eq!(
            utf8(&ops),
            vec![
                B_PROTOCOL_ADDRESS, "hello", "text/markdown", "UTF-8", "|",
                MAP_PROTOCOL_ADDRESS, "SET", "app", "shuallet", "type", "post",
                "paymail", "a@b.c",
            ]
        );
    }

    #[test]
    fn texts_precede_images() {
        let mut content = PostContent::new();
        content.add_image("data:image/png;base64,AAA=").unwrap();
        content.add_text("caption", "text/plain");
        let ops = social().post(content).unwrap();
        let tokens = ops.tokens();
        assert_eq!(tokens[1], b"caption");
        assert_eq!(tokens[5], B_PROTOCOL_ADDRESS.as_bytes());
        assert_eq!(tokens[6], vec![0, 0]);
        assert_eq!(tokens[7], b"image/png");
        assert_eq!(tokens[8], b"|");
    }

    #[test]
    fn post_without_content_is_empty() {
        assert!(matches!(
            social().post(PostContent::new()),
            Err(SocialError::EmptyContent(_))
        ));
    }

    #[test]
    fn reply_carries_context() {
        let mut content = PostContent::new();
        content.add_markdown("yes");
        let ops = social().reply("abc", content).unwrap();
        let tail: Vec<String> = utf8(&ops).into_iter().skip(5).collect();
        assert_eq!(
            tail,
            vec![MAP_PROTOCOL_ADDRESS, "SET", "app", "shuallet", "type", "post", "context", "tx", "tx", "abc"]
        );
    }

    #[test]
    fn repost_carries_tx_without_context() {
        let ops = social().repost("abc").unwrap();
        assert_eq!(
            utf8(&ops),
            vec![MAP_PROTOCOL_ADDRESS, "SET", "app", "shuallet", "type", "repost", "tx", "abc"]
        );
        assert!(matches!(social().repost(""), Err(SocialError::EmptyContent(_))));
    }

    #[test]
    fn repost_encodes_no_content_group() {
        let op = SocialOperation::Repost { tx_id: "abc".into() };
        let ops = op.encode("shuallet").unwrap();
        assert_eq!(ops.tokens()[0], MAP_PROTOCOL_ADDRESS.as_bytes());
        assert!(!ops.tokens().iter().any(|t| t == B_PROTOCOL_ADDRESS.as_bytes()));
        assert_eq!(ops, social().repost("abc").unwrap());
    }

    #[test]
    fn like_without_tx_is_empty_content() {
        let op = SocialOperation::Like {
            tx_id: String::new(),
            emoji: None,
        };
        assert!(matches!(op.encode("shuallet"), Err(SocialError::EmptyContent(_))));
    }

    #[test]
    fn like_with_emoji() {
        let ops = social().like("abc", Some("🔥")).unwrap();
        let rendered = utf8(&ops);
        assert_eq!(&rendered[4..6], &["type", "like"]);
        assert_eq!(&rendered[rendered.len() - 2..], &["emoji", "🔥"]);
    }

    #[test]
    fn emoji_validation() {
        for ok in ["👍", "👍🏽", "❤️", "👨‍👩‍👧", "🇺🇸", "1️⃣"] {
            assert!(validate_emoji(ok).is_ok(), "{ok}");
        }
        for bad in ["hello", "👍👍", "a", "🔥 ", "1", "#", "*", "42"] {
            assert_eq!(
                validate_emoji(bad),
                Err(SocialError::InvalidEmoji(bad.into())),
                "{bad}"
            );
        }
        assert!(matches!(
            social().like("abc", Some("nope")),
            Err(SocialError::InvalidEmoji(_))
        ));
        assert!(matches!(
            social().like("abc", Some("1")),
            Err(SocialError::InvalidEmoji(_))
        ));
        // An empty emoji is the same as none.
        assert_eq!(social().like("abc", Some("")).unwrap().len(), 10);
    }

    #[test]
    fn tip_amount_and_default_currency() {
        let ops = social().tip("abc", Some(2.5), None).unwrap();
        let rendered = utf8(&ops);
        assert_eq!(&rendered[10..], &["amount", "2.5", "currency", "USD"]);

        let whole = social().tip("abc", Some(1.0), Some("EUR")).unwrap();
        assert_eq!(&utf8(&whole)[10..], &["amount", "1", "currency", "EUR"]);

        assert_eq!(social().tip("abc", None, None).unwrap().len(), 10);
        assert_eq!(social().tip("abc", Some(0.0), None).unwrap().len(), 10);
        assert!(matches!(
            social().tip("", Some(1.0), None),
            Err(SocialError::EmptyContent(_))
        ));
    }

    #[test]
    fn follow_and_unfollow() {
        let ops = social().follow("idkey").unwrap();
        assert_eq!(
            utf8(&ops),
            vec![MAP_PROTOCOL_ADDRESS, "SET", "app", "shuallet", "type", "follow", "idKey", "idkey"]
        );
        let ops = social().unfollow("idkey").unwrap();
        assert_eq!(utf8(&ops)[5], "unfollow");
        assert_eq!(ops.kind(), OperationKind::Unfollow);
        assert!(matches!(social().follow(""), Err(SocialError::EmptyContent(_))));
    }
}
