//! WebVTT parsing.

use super::{prepare, timestamp_seconds, MARKUP_TAG};
use crate::error::{ChannelChatError, Result};
use crate::transcription::Segment;
use regex::Regex;
use std::sync::LazyLock;

static CUE_TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\d:.]+)\s*-->\s*([\d:.]+)").expect("Invalid VTT timing regex")
});

static VTT_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+):)?(\d{2}):(\d{2})\.(\d{3})$").expect("Invalid VTT timestamp regex")
});

/// Parse WebVTT content into one segment per cue.
///
/// Everything before the first cue timing line (header, metadata, style
/// blocks) is ignored, as are cue identifiers and `NOTE` blocks. Cue text runs
/// until a blank line or the next timing line; markup tags are removed.
pub fn parse_vtt(content: &str) -> Result<Vec<Segment>> {
    let content = prepare(content);
    let lines: Vec<&str> = content.lines().collect();

    let mut i = lines
        .iter()
        .position(|l| is_header(l))
        .map(|p| p + 1)
        .unwrap_or(0);

    let mut segments = Vec::new();

    while i < lines.len() {
        let line = lines[i].trim();
        i += 1;

        if !is_cue_timing(line) {
            continue;
        }

        let (start_time, end_time) = parse_cue_timing(line)?;

        let mut text_lines = Vec::new();
        while i < lines.len() {
            let text_line = lines[i];
            if text_line.trim().is_empty() || is_cue_timing(text_line.trim()) {
                break;
            }
            let clean = MARKUP_TAG.replace_all(text_line, "");
            let clean = clean.trim();
            if !clean.is_empty() {
                text_lines.push(clean.to_string());
            }
            i += 1;
        }

        let text = text_lines.join(" ");
        if !text.is_empty() {
            segments.push(Segment::new(text, start_time, end_time));
        }
    }

    Ok(segments)
}

fn is_header(line: &str) -> bool {
    let line = line.trim();
    line == "WEBVTT" || line.starts_with("WEBVTT ") || line.starts_with("WEBVTT\t")
}

/// A line that claims to be a cue timing: it starts with a digit and carries
/// an arrow. Comments and cue text that merely contain `-->` do not count.
fn is_cue_timing(line: &str) -> bool {
    line.starts_with(|c: char| c.is_ascii_digit()) && line.contains("-->")
}

fn parse_cue_timing(line: &str) -> Result<(f64, f64)> {
    let caps = CUE_TIMING
        .captures(line)
        .ok_or_else(|| ChannelChatError::MalformedTimestamp(line.to_string()))?;
    Ok((parse_vtt_timestamp(&caps[1])?, parse_vtt_timestamp(&caps[2])?))
}

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds.
pub(crate) fn parse_vtt_timestamp(timestamp: &str) -> Result<f64> {
    let malformed = || ChannelChatError::MalformedTimestamp(timestamp.to_string());
    let caps = VTT_TIMESTAMP.captures(timestamp.trim()).ok_or_else(malformed)?;
    let hours = caps.get(1).map_or("0", |m| m.as_str());
    timestamp_seconds(hours, &caps[2], &caps[3], &caps[4]).ok_or_else(malformed)
}
