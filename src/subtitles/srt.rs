//! SubRip parsing.

use super::{prepare, timestamp_seconds, MARKUP_TAG};
use crate::error::{ChannelChatError, Result};
use crate::transcription::Segment;
use regex::Regex;
use std::sync::LazyLock;

static BLOCK_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("Invalid SRT block regex"));

static BLOCK_TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\d:,.]+)\s*-->\s*([\d:,.]+)").expect("Invalid SRT timing regex")
});

static SRT_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2,}):(\d{2}):(\d{2})[,.](\d{3})$").expect("Invalid SRT timestamp regex")
});

/// Override tags such as `{\an8}`.
static OVERRIDE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]+\}").expect("Invalid SRT override regex"));

/// Parse SubRip content into one segment per block.
///
/// Blocks are separated by blank lines. Blocks with fewer than two lines or
/// without a timing line are skipped; a timing line that cannot be parsed
/// fails the whole file.
pub fn parse_srt(content: &str) -> Result<Vec<Segment>> {
    let content = prepare(content);
    let mut segments = Vec::new();

    for block in BLOCK_SEPARATOR.split(content.trim()) {
        let lines: Vec<&str> = block.trim().lines().collect();
        if lines.len() < 2 {
            continue;
        }

        let Some(timing_idx) = lines.iter().position(|l| l.contains("-->")) else {
            continue;
        };

        let timing = lines[timing_idx].trim();
        let caps = BLOCK_TIMING
            .captures(timing)
            .ok_or_else(|| ChannelChatError::MalformedTimestamp(timing.to_string()))?;
        let start_time = parse_srt_timestamp(&caps[1])?;
        let end_time = parse_srt_timestamp(&caps[2])?;

        let text = lines[timing_idx + 1..]
            .iter()
            .map(|l| {
                let l = MARKUP_TAG.replace_all(l, "");
                OVERRIDE_TAG.replace_all(&l, "").trim().to_string()
            })
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !text.is_empty() {
            segments.push(Segment::new(text, start_time, end_time));
        }
    }

    Ok(segments)
}

/// Parse `HH:MM:SS,mmm` into seconds. A `.` decimal separator is tolerated.
pub(crate) fn parse_srt_timestamp(timestamp: &str) -> Result<f64> {
    let malformed = || ChannelChatError::MalformedTimestamp(timestamp.to_string());
    let caps = SRT_TIMESTAMP.captures(timestamp.trim()).ok_or_else(malformed)?;
    timestamp_seconds(&caps[1], &caps[2], &caps[3], &caps[4])
        .ok_or_else(malformed)
}
