//! Post content: texts, images and extra metadata pairs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::SocialError;
use crate::protocol::{DEFAULT_TEXT_TYPE, SEPARATOR};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextItem {
    pub text: String,
    pub media_type: String,
}

/// Decoded image bytes and their `image/*` media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub data: Vec<u8>,
    pub media_type: String,
}

impl Image {
    /// Parse a `data:image/<subtype>;base64,<payload>` URL.
    pub fn from_data_url(data_url: &str) -> Result<Self, SocialError> {
        let invalid = || SocialError::InvalidImageFormat(truncate(data_url));

        let rest = data_url.trim().strip_prefix("data:").ok_or_else(invalid)?;
        let (header, payload) = rest.split_once(',').ok_or_else(invalid)?;
        let (media_type, scheme) = header.split_once(';').ok_or_else(invalid)?;
        if scheme != "base64" || !media_type.starts_with("image/") {
            return Err(invalid());
        }
        let data = BASE64.decode(payload).map_err(|e| {
            SocialError::InvalidImageFormat(format!("bad base64 payload: {e}"))
        })?;
        Ok(Self {
            data,
            media_type: media_type.to_owned(),
        })
    }
}

fn truncate(s: &str) -> String {
    const MAX: usize = 32;
    match s.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_owned(),
    }
}

/// Content of a post, reply or repost.
///
/// Texts are always encoded before images, each kind in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostContent {
    texts: Vec<TextItem>,
    images: Vec<Image>,
    map_data: Vec<(String, String)>,
}

impl PostContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_text(&mut self, text: impl Into<String>, media_type: impl Into<String>) -> &mut Self {
        self.texts.push(TextItem {
            text: text.into(),
            media_type: media_type.into(),
        });
        self
    }

    /// Add a `text/markdown` text.
    pub fn add_markdown(&mut self, markdown: impl Into<String>) -> &mut Self {
        self.add_text(markdown, DEFAULT_TEXT_TYPE)
    }

    pub fn add_image(&mut self, data_url: &str) -> Result<&mut Self, SocialError> {
        self.images.push(Image::from_data_url(data_url)?);
        Ok(self)
    }

    /// Add an extra metadata pair. A repeated key replaces the earlier value
    /// in place. The separator `|` is reserved and cannot be a key.
    pub fn add_map_data(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<&mut Self, SocialError> {
        let key = key.into();
        if key.is_empty() {
            return Err(SocialError::InvalidMapData("empty key".into()));
        }
        if key == SEPARATOR {
            return Err(SocialError::InvalidMapData(format!("{SEPARATOR:?} is reserved")));
        }
        let value = value.into();
        match self.map_data.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.map_data.push((key, value)),
        }
        Ok(self)
    }

    pub fn texts(&self) -> &[TextItem] {
        &self.texts
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn map_data(&self) -> &[(String, String)] {
        &self.map_data
    }

    pub fn has_content(&self) -> bool {
        !self.texts.is_empty() || !self.images.is_empty()
    }
}
