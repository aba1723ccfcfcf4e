//! Transcript segments and the speech-to-text boundary.
//!
//! Segments come either from subtitle files (see [`crate::subtitles`]) or from a
//! [`Transcriber`] whose word-level output is grouped into sentences. Either
//! way they pass through [`normalize_segments`] before chunking.

mod elevenlabs;
mod models;
mod normalize;
mod words;

pub use elevenlabs::{ElevenLabsTranscriber, API_KEY_ENV};
pub use models::{Segment, TranscribedWord, WordTranscription};
pub use normalize::normalize_segments;
pub use words::segments_from_words;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for speech-to-text services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file into timestamped segments.
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<Segment>>;
}
