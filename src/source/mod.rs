//! Content fetching: channel and video metadata, subtitles and audio.
//!
//! The pipeline only sees the [`ContentFetcher`] trait; [`YtDlpFetcher`] is the
//! production implementation.

mod ytdlp;

pub use ytdlp::YtDlpFetcher;

use crate::error::{ChannelChatError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use url::Url;

/// Matches YouTube watch/short/embed URLs and bare 11-character IDs.
static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?:
            (?:https?://)?
            (?:www\.|m\.)?
            (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/shorts/|youtube\.com/v/)
            ([a-zA-Z0-9_-]{11})
        )
        |
        ^([a-zA-Z0-9_-]{11})$
    ",
    )
    .expect("Invalid video ID regex")
});

/// Channel metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub channel_id: String,
    pub name: String,
    pub url: String,
}

/// Video metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Duration in seconds.
    pub duration: Option<f64>,
    /// Upload date as `YYYY-MM-DD`.
    pub published_at: Option<String>,
    pub thumbnail_url: Option<String>,
    pub channel_id: Option<String>,
}

impl VideoInfo {
    /// Metadata with only an ID and a title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            duration: None,
            published_at: None,
            thumbnail_url: None,
            channel_id: None,
        }
    }
}

/// Source of channel listings, video metadata and media files.
///
/// "Not found" conditions are permanent errors and are never retried.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Resolve a channel URL to its metadata.
    async fn channel_info(&self, url: &str) -> Result<ChannelInfo>;

    /// IDs of the channel's uploads, newest first.
    async fn channel_videos(&self, url: &str) -> Result<Vec<String>>;

    /// Metadata for a single video.
    async fn video_info(&self, video_id: &str) -> Result<VideoInfo>;

    /// Download English subtitles into `dir`. `None` when the video has none.
    async fn download_subtitles(&self, video_id: &str, dir: &Path) -> Result<Option<PathBuf>>;

    /// Download the audio track into `dir`.
    async fn download_audio(&self, video_id: &str, dir: &Path) -> Result<PathBuf>;
}

/// Extract a video ID from a YouTube URL or a bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = VIDEO_ID.captures(input.trim())?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Watch URL for a video ID.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Canonical channel URL. Accepts full URLs and `@handle` shorthand.
pub fn normalize_channel_url(input: &str) -> Result<String> {
    let input = input.trim();
    if let Some(handle) = input.strip_prefix('@') {
        if handle.is_empty() {
            return Err(ChannelChatError::InvalidInput("Empty channel handle".to_string()));
        }
        return Ok(format!("https://www.youtube.com/@{}", handle));
    }

    let url = Url::parse(input)
        .map_err(|e| ChannelChatError::InvalidInput(format!("Invalid channel URL '{}': {}", input, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url.to_string().trim_end_matches('/').to_string()),
        other => Err(ChannelChatError::InvalidInput(format!(
            "Unsupported URL scheme '{}' in {}",
            other, input
        ))),
    }
}

/// URL of a channel's uploads tab.
pub fn channel_videos_url(channel_url: &str) -> String {
    if channel_url.contains("/videos") {
        channel_url.to_string()
    } else {
        format!("{}/videos", channel_url.trim_end_matches('/'))
    }
}
