//! Error types for channel-chat.

use thiserror::Error;

/// Library-level error type for channel-chat operations.
#[derive(Error, Debug)]
pub enum ChannelChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unrecognized subtitle format: {0}")]
    SubtitleFormat(String),

    #[error("Malformed subtitle timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("Content fetch failed: {0}")]
    Fetch(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Rate limited by embedding service: {0}")]
    RateLimited(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ChannelChatError {
    /// Whether this error signals rate limiting or an exhausted quota.
    ///
    /// Collaborator errors that were not classified at the boundary are
    /// recognized by their message.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            ChannelChatError::RateLimited(_) => true,
            ChannelChatError::Embedding(msg) => is_rate_limit_message(msg),
            ChannelChatError::Http(e) => {
                e.status().is_some_and(|s| s.as_u16() == 429)
                    || is_rate_limit_message(&e.to_string())
            }
            _ => false,
        }
    }
}

const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "ratelimit",
    "too many requests",
    "quota",
    "429",
];

/// Check an error message for rate-limit, quota or HTTP-429 markers.
pub fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Result type alias for channel-chat operations.
pub type Result<T> = std::result::Result<T, ChannelChatError>;
