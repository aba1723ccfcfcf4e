//! Turning ranked store matches into user-facing search results.

mod searcher;

pub use searcher::Searcher;

use crate::chunking::TITLE_SEPARATOR;
use crate::vector_store::RankedMatch;
use serde::Serialize;

const WATCH_URL: &str = "https://youtube.com/watch";

/// A search hit ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Chunk text without the title prefix.
    pub text: String,
    pub video_id: String,
    pub video_title: String,
    pub channel_id: Option<String>,
    pub channel_name: Option<String>,
    pub start_time: f64,
    pub end_time: f64,
    /// Link that opens the video at the chunk start.
    pub deep_link: String,
    /// `1 - distance`; higher is better.
    pub score: f64,
}

impl SearchResult {
    /// Start time formatted for display.
    pub fn timestamp(&self) -> String {
        format_timestamp(self.start_time)
    }
}

/// Convert ranked matches into results, keeping the store's order and at
/// most `top_k` entries.
pub fn assemble(matches: Vec<RankedMatch>, top_k: usize) -> Vec<SearchResult> {
    matches
        .into_iter()
        .take(top_k)
        .map(|m| {
            let chunk = m.chunk;
            SearchResult {
                text: strip_title_prefix(&chunk.text, &chunk.video_title).to_string(),
                deep_link: deep_link(&chunk.video_id, chunk.start_time),
                score: 1.0 - m.distance,
                video_id: chunk.video_id,
                video_title: chunk.video_title,
                channel_id: chunk.channel_id,
                channel_name: chunk.channel_name,
                start_time: chunk.start_time,
                end_time: chunk.end_time,
            }
        })
        .collect()
}

/// Remove the title prefix from stored chunk text.
///
/// Tries `"<title>: "`, then `"<title> | "`, then drops everything up to and
/// including the first `" | "`. Text without any of these is returned whole.
pub fn strip_title_prefix<'a>(text: &'a str, title: &str) -> &'a str {
    if let Some(rest) = text.strip_prefix(&format!("{}: ", title)) {
        return rest;
    }
    if let Some(rest) = text.strip_prefix(&format!("{}{}", title, TITLE_SEPARATOR)) {
        return rest;
    }
    match text.split_once(TITLE_SEPARATOR) {
        Some((_, rest)) => rest,
        None => text,
    }
}

/// Watch URL starting at `start_time`, rounded half to even.
pub fn deep_link(video_id: &str, start_time: f64) -> String {
    let seconds = start_time.max(0.0).round_ties_even() as u64;
    format!("{}?v={}&t={}", WATCH_URL, video_id, seconds)
}

/// Format seconds as `M:SS`, or `H:MM:SS` from one hour on.
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}
