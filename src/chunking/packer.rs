//! Token-budgeted chunk packing with segment overlap.

use super::{Chunk, TiktokenCounter, TokenCounter, TITLE_SEPARATOR};
use crate::config::ChunkingSettings;
use crate::error::{ChannelChatError, Result};
use crate::transcription::Segment;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Packs segments into chunks of at most `target_tokens` tokens.
///
/// After a chunk is emitted, the next one starts with the trailing segments of
/// the previous chunk that fit in `floor(target_tokens * overlap_pct)` tokens.
/// The most recent segment is always carried, even when it alone exceeds that
/// budget. A segment larger than the target that arrives with nothing pending
/// is emitted as a chunk of its own.
///
/// Only segment text is counted; the title prefix is not part of the budget.
pub struct Chunker {
    counter: Arc<dyn TokenCounter>,
    target_tokens: usize,
    overlap_pct: f64,
}

impl Chunker {
    /// Create a chunker. `target_tokens` must be positive and `overlap_pct`
    /// must lie in `[0, 1)`.
    pub fn new(counter: Arc<dyn TokenCounter>, target_tokens: usize, overlap_pct: f64) -> Result<Self> {
        if target_tokens == 0 {
            return Err(ChannelChatError::InvalidInput(
                "target_tokens must be greater than zero".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&overlap_pct) {
            return Err(ChannelChatError::InvalidInput(format!(
                "overlap_pct must be in [0, 1), got {}",
                overlap_pct
            )));
        }

        Ok(Self {
            counter,
            target_tokens,
            overlap_pct,
        })
    }

    /// Create a chunker with the BPE encoding named in the settings.
    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self> {
        let counter = TiktokenCounter::new(&settings.encoding)?;
        Self::new(Arc::new(counter), settings.target_tokens, settings.overlap_pct)
    }

    /// Token budget for the overlap carried into the next chunk.
    pub fn overlap_budget(&self) -> usize {
        (self.target_tokens as f64 * self.overlap_pct).floor() as usize
    }

    /// Count tokens with this chunker's oracle.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    /// Split `segments` into chunks prefixed with `title`.
    #[instrument(skip(self, segments), fields(segments = segments.len()))]
    pub fn chunk(&self, segments: &[Segment], title: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        if segments.is_empty() {
            return chunks;
        }

        let overlap_budget = self.overlap_budget();
        let mut current: Vec<(&Segment, usize)> = Vec::new();
        let mut current_tokens = 0;

        for segment in segments {
            let tokens = self.counter.count(&segment.text);

            if tokens > self.target_tokens && current.is_empty() {
                chunks.push(build_chunk(title, &[(segment, tokens)], chunks.len()));
                continue;
            }

            if current_tokens + tokens > self.target_tokens && !current.is_empty() {
                chunks.push(build_chunk(title, &current, chunks.len()));
                current = overlap_tail(&current, overlap_budget);
                current_tokens = current.iter().map(|(_, t)| t).sum();
            }

            current.push((segment, tokens));
            current_tokens += tokens;
        }

        if !current.is_empty() {
            chunks.push(build_chunk(title, &current, chunks.len()));
        }

        debug!("Packed {} segments into {} chunks", segments.len(), chunks.len());
        chunks
    }
}

/// Trailing segments that fit in `budget`, in original order. Never empty for
/// non-empty input.
fn overlap_tail<'a>(current: &[(&'a Segment, usize)], budget: usize) -> Vec<(&'a Segment, usize)> {
    let mut tail = Vec::new();
    let mut tokens = 0;

    for &(segment, count) in current.iter().rev() {
        if tokens + count <= budget {
            tail.push((segment, count));
            tokens += count;
        } else {
            if tail.is_empty() {
                tail.push((segment, count));
            }
            break;
        }
    }

    tail.reverse();
    tail
}

fn build_chunk(title: &str, segments: &[(&Segment, usize)], seq: usize) -> Chunk {
    let body = segments
        .iter()
        .map(|(s, _)| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    // Callers never pass an empty slice.
    let start_time = segments.first().map(|(s, _)| s.start_time).unwrap_or_default();
    let end_time = segments.last().map(|(s, _)| s.end_time).unwrap_or_default();

    Chunk {
        text: format!("{}{}{}", title, TITLE_SEPARATOR, body),
        start_time,
        end_time,
        seq: seq as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::WordCounter;

    fn chunker(target: usize, overlap: f64) -> Chunker {
        Chunker::new(Arc::new(WordCounter), target, overlap).unwrap()
    }

    fn seg(text: &str, start: f64, end: f64) -> Segment {
        Segment::new(text, start, end)
    }

    fn body(chunk: &Chunk) -> &str {
        chunk
            .text
            .split_once(TITLE_SEPARATOR)
            .map(|(_, b)| b)
            .unwrap_or_default()
    }

    /// Segments of 1-3 unique words with increasing, non-overlapping times.
    fn word_segments(count: usize) -> Vec<Segment> {
        let mut word = 0;
        (0..count)
            .map(|i| {
                let len = i % 3 + 1;
                let text = (0..len)
                    .map(|_| {
                        word += 1;
                        format!("w{}", word)
                    })
                    .collect::<Vec<_>>()
                    .join(" ");
                seg(&text, i as f64, i as f64 + 1.0)
            })
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(chunker(800, 0.15).chunk(&[], "T").is_empty());
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        let counter: Arc<dyn TokenCounter> = Arc::new(WordCounter);
        assert!(Chunker::new(counter.clone(), 0, 0.15).is_err());
        assert!(Chunker::new(counter.clone(), 800, 1.0).is_err());
        assert!(Chunker::new(counter.clone(), 800, -0.1).is_err());
        assert!(Chunker::new(counter.clone(), 800, f64::NAN).is_err());
        assert!(Chunker::new(counter, 800, 0.0).is_ok());
    }

    #[test]
    fn test_overlap_budget_floors() {
        assert_eq!(chunker(800, 0.15).overlap_budget(), 120);
        assert_eq!(chunker(7, 0.5).overlap_budget(), 3);
    }

    #[test]
    fn test_large_tail_is_carried_anyway() {
        let segments = vec![
            seg("a b c", 0.0, 1.0),
            seg("d e f", 1.0, 2.0),
            seg("g h i", 2.0, 3.0),
        ];

        let chunks = chunker(4, 0.5).chunk(&segments, "T");

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "T | a b c");
        assert_eq!((chunks[0].start_time, chunks[0].end_time), (0.0, 1.0));
        assert_eq!(chunks[1].text, "T | a b c d e f");
        assert_eq!((chunks[1].start_time, chunks[1].end_time), (0.0, 2.0));
        assert_eq!(chunks[2].text, "T | d e f g h i");
        assert_eq!((chunks[2].start_time, chunks[2].end_time), (1.0, 3.0));
    }

    #[test]
    fn test_exact_fit_stays_in_chunk() {
        let segments = vec![
            seg("a b", 0.0, 1.0),
            seg("c d", 1.0, 2.0),
            seg("e f", 2.0, 3.0),
            seg("g h", 3.0, 4.0),
        ];

        let chunks = chunker(4, 0.5).chunk(&segments, "T");

        let texts: Vec<_> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["T | a b c d", "T | c d e f", "T | e f g h"]);
        assert_eq!(chunks[2].start_time, 2.0);
        assert_eq!(chunks[2].end_time, 4.0);
    }

    #[test]
    fn test_single_oversized_segment() {
        let text = vec!["word"; 1000].join(" ");
        let chunks = chunker(800, 0.15).chunk(&[seg(&text, 0.0, 60.0)], "Talk");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].seq, 0);
        assert_eq!(chunks[0].text, format!("Talk | {}", text));
    }

    #[test]
    fn test_oversized_segment_after_pending_text() {
        let big = vec!["x"; 10].join(" ");
        let segments = vec![seg("a b", 0.0, 1.0), seg(&big, 1.0, 2.0), seg("c", 2.0, 3.0)];

        let chunks = chunker(4, 0.25).chunk(&segments, "T");

        assert_eq!(chunks.len(), 3);
        assert_eq!(body(&chunks[0]), "a b");
        assert_eq!(body(&chunks[1]), format!("a b {}", big));
        assert_eq!(body(&chunks[2]), format!("{} c", big));
    }

    #[test]
    fn test_zero_overlap_still_carries_last_segment() {
        let segments = vec![seg("a b", 0.0, 1.0), seg("c d", 1.0, 2.0), seg("e f", 2.0, 3.0)];
        let chunks = chunker(4, 0.0).chunk(&segments, "T");

        assert_eq!(chunks.len(), 2);
        assert_eq!(body(&chunks[1]), "c d e f");
    }

    #[test]
    fn test_chunk_properties() {
        let segments = word_segments(60);
        let c = chunker(10, 0.2);
        let chunks = c.chunk(&segments, "My Video");

        assert!(chunks.len() > 1);

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.seq, i as u32);
            assert!(chunk.text.starts_with("My Video | "));
            assert!(c.count_tokens(body(chunk)) <= 10, "chunk {} over budget", i);
        }

        for pair in chunks.windows(2) {
            assert!(pair[1].end_time >= pair[0].end_time);
            assert!(pair[1].start_time >= pair[0].start_time);
            assert!(pair[1].start_time < pair[0].end_time, "missing overlap");
        }

        for segment in &segments {
            assert!(
                chunks.iter().any(|c| body(c).contains(&segment.text)),
                "segment {:?} not covered",
                segment.text
            );
        }
    }
}
