//! Social encoder error types.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SocialError {
    #[error("empty content: {0}")] EmptyContent(String),
    #[error("invalid image data URL: {0}")] InvalidImageFormat(String),
    #[error("invalid emoji: {0:?}")] InvalidEmoji(String),
    #[error("app name needs to be set")] MissingAppName,
    #[error("invalid map data: {0}")] InvalidMapData(String),
    #[error("malformed token sequence: {0}")] Malformed(String),
    #[error("signing: {0}")] Signing(String),
}
