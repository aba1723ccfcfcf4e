//! Data models for transcripts.

use serde::{Deserialize, Serialize};

/// A contiguous span of spoken text with a time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Spoken text.
    pub text: String,
    /// Start time in seconds.
    pub start_time: f64,
    /// End time in seconds.
    pub end_time: f64,
}

impl Segment {
    /// Create a new segment.
    pub fn new(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            text: text.into(),
            start_time,
            end_time,
        }
    }

    /// Duration of this segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// A single word with timing from a word-level speech-to-text result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribedWord {
    /// The word text, possibly with trailing punctuation.
    pub text: String,
    /// Start time in seconds.
    #[serde(default)]
    pub start: f64,
    /// End time in seconds.
    #[serde(default)]
    pub end: f64,
}

/// Word-level transcription result as returned by the speech-to-text service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordTranscription {
    /// Full transcript text, when provided.
    #[serde(default)]
    pub text: Option<String>,
    /// Words with timestamps, in spoken order.
    #[serde(default)]
    pub words: Vec<TranscribedWord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_duration() {
        let segment = Segment::new("Hello world", 1.5, 4.0);
        assert_eq!(segment.duration(), 2.5);
    }

    #[test]
    fn test_word_transcription_tolerates_missing_fields() {
        let json = r#"{
            "language_code": "en",
            "text": "Hi there.",
            "words": [
                {"text": "Hi", "start": 0.0, "end": 0.4, "type": "word"},
                {"text": "there.", "start": 0.5, "end": 0.9, "type": "word"}
            ]
        }"#;

        let parsed: WordTranscription = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text.as_deref(), Some("Hi there."));
        assert_eq!(parsed.words.len(), 2);
        assert_eq!(parsed.words[1].end, 0.9);

        let empty: WordTranscription = serde_json::from_str("{}").unwrap();
        assert!(empty.words.is_empty());
        assert!(empty.text.is_none());
    }
}
