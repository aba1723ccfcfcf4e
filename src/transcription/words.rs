//! Conversion of word-level speech-to-text output into sentence segments.

use super::{Segment, WordTranscription};

const SENTENCE_ENDINGS: [char; 3] = ['.', '!', '?'];

/// Group timed words into one segment per sentence.
///
/// A word ending in `.`, `!` or `?` closes the current sentence. Words left
/// over at the end form a final segment. When the result has no word timings
/// at all, the full text becomes a single zero-length segment and is left for
/// the normalizer to repair.
pub fn segments_from_words(transcription: &WordTranscription) -> Vec<Segment> {
    let words: Vec<_> = transcription
        .words
        .iter()
        .filter(|w| !w.text.trim().is_empty())
        .collect();

    if words.is_empty() {
        return match transcription.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => vec![Segment::new(text, 0.0, 0.0)],
            _ => Vec::new(),
        };
    }

    let mut segments = Vec::new();
    let mut sentence: Vec<&str> = Vec::new();
    let mut sentence_start = None;

    for word in &words {
        let text = word.text.trim();
        let start = *sentence_start.get_or_insert(word.start);
        sentence.push(text);

        if text.ends_with(SENTENCE_ENDINGS) {
            segments.push(Segment::new(sentence.join(" "), start, word.end));
            sentence.clear();
            sentence_start = None;
        }
    }

    if let (Some(start), Some(last)) = (sentence_start, words.last()) {
        segments.push(Segment::new(sentence.join(" "), start, last.end));
    }

    segments
}
