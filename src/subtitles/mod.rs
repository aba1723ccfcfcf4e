//! Subtitle file parsing.
//!
//! Two dialects are supported: WebVTT (`.vtt`) and SubRip (`.srt`). The dialect
//! is taken from the file extension when it is recognized, otherwise sniffed
//! from the content.

mod srt;
mod vtt;

pub use srt::parse_srt;
pub use vtt::parse_vtt;

use crate::error::{ChannelChatError, Result};
use crate::transcription::Segment;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, instrument};

/// Inline markup such as `<c>`, `<i>` or `<00:00:01.000>`.
pub(crate) static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("Invalid markup regex"));

static SRT_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\d+\s*\n\d{2}:\d{2}:\d{2},\d{3}").expect("Invalid SRT signature regex")
});

/// Supported subtitle dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleFormat {
    /// WebVTT: `WEBVTT` header, `.` decimal separator.
    WebVtt,
    /// SubRip: numbered blocks, `,` decimal separator.
    Srt,
}

impl SubtitleFormat {
    /// Format implied by a file extension, if recognized.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "vtt" => Some(SubtitleFormat::WebVtt),
            "srt" => Some(SubtitleFormat::Srt),
            _ => None,
        }
    }

    /// Guess the format from file content.
    pub fn sniff(content: &str) -> Option<Self> {
        let content = prepare(content);
        if content.trim_start().starts_with("WEBVTT") {
            return Some(SubtitleFormat::WebVtt);
        }
        if SRT_SIGNATURE.is_match(&content) {
            return Some(SubtitleFormat::Srt);
        }
        None
    }

    /// Determine the format of `path` by extension, falling back to content.
    pub fn detect(path: &Path, content: &str) -> Result<Self> {
        Self::from_extension(path)
            .or_else(|| Self::sniff(content))
            .ok_or_else(|| {
                ChannelChatError::SubtitleFormat(format!(
                    "cannot determine subtitle format for {}; expected .vtt or .srt extension or recognizable content",
                    path.display()
                ))
            })
    }
}

impl std::str::FromStr for SubtitleFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vtt" | "webvtt" => Ok(SubtitleFormat::WebVtt),
            "srt" | "subrip" => Ok(SubtitleFormat::Srt),
            _ => Err(format!("Unknown subtitle format: {}. Use vtt or srt.", s)),
        }
    }
}

impl std::fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubtitleFormat::WebVtt => write!(f, "vtt"),
            SubtitleFormat::Srt => write!(f, "srt"),
        }
    }
}

/// Parse subtitle text in the given format.
pub fn parse_subtitle_str(content: &str, format: SubtitleFormat) -> Result<Vec<Segment>> {
    match format {
        SubtitleFormat::WebVtt => parse_vtt(content),
        SubtitleFormat::Srt => parse_srt(content),
    }
}

/// Read and parse a subtitle file, detecting its format.
#[instrument(fields(path = %path.display()))]
pub fn parse_subtitles(path: &Path) -> Result<Vec<Segment>> {
    let content = std::fs::read_to_string(path)?;
    let format = SubtitleFormat::detect(path, &content)?;
    let segments = parse_subtitle_str(&content, format)?;
    debug!("Parsed {} {} cues", segments.len(), format);
    Ok(segments)
}

/// Strip a byte-order mark and normalize line endings.
pub(crate) fn prepare(content: &str) -> String {
    content.trim_start_matches('\u{feff}').replace("\r\n", "\n")
}

/// Combine validated timestamp fields into seconds.
///
/// Milliseconds are summed as integers so `01:01:01,001` is exactly `3661.001`.
pub(crate) fn timestamp_seconds(hours: &str, minutes: &str, seconds: &str, millis: &str) -> Option<f64> {
    let hours: u64 = hours.parse().ok()?;
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    let millis: u64 = millis.parse().ok()?;
    let total = hours
        .checked_mul(3_600_000)?
        .checked_add(minutes * 60_000 + seconds * 1000 + millis)?;
    Some(total as f64 / 1000.0)
}
