//! Segment cleanup: whitespace, time-range repair and short-segment merging.

use super::Segment;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Duration given to segments whose start and end coincide.
const MIN_SYNTHETIC_DURATION: f64 = 0.1;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Normalize raw segments before chunking.
///
/// Collapses whitespace, drops empty segments, repairs degenerate or inverted
/// time ranges and merges segments shorter than `min_duration` into their
/// successor when the gap between them is at most `merge_gap`. Merging is a
/// single forward pass; a `min_duration` of zero or less disables it.
pub fn normalize_segments(segments: &[Segment], min_duration: f64, merge_gap: f64) -> Vec<Segment> {
    let cleaned: Vec<Segment> = segments.iter().filter_map(clean_segment).collect();

    if min_duration <= 0.0 {
        return cleaned;
    }

    let merged = merge_short_segments(cleaned, min_duration, merge_gap);
    debug!("Normalized {} raw segments into {}", segments.len(), merged.len());
    merged
}

fn clean_segment(segment: &Segment) -> Option<Segment> {
    let text = WHITESPACE.replace_all(&segment.text, " ").trim().to_string();
    if text.is_empty() {
        return None;
    }

    let (mut start, mut end) = (segment.start_time, segment.end_time);
    if start > end {
        std::mem::swap(&mut start, &mut end);
    } else if start == end {
        end = start + MIN_SYNTHETIC_DURATION;
    }

    Some(Segment::new(text, start, end))
}

fn merge_short_segments(segments: Vec<Segment>, min_duration: f64, merge_gap: f64) -> Vec<Segment> {
    let mut iter = segments.into_iter();
    let Some(mut current) = iter.next() else {
        return Vec::new();
    };

    let mut result = Vec::new();
    for next in iter {
        let gap = next.start_time - current.end_time;

        if current.duration() < min_duration && gap <= merge_gap {
            current.text.push(' ');
            current.text.push_str(&next.text);
            current.end_time = current.end_time.max(next.end_time);
        } else {
            result.push(std::mem::replace(&mut current, next));
        }
    }
    result.push(current);

    result
}
