//! Splitting normalized transcript segments into retrieval chunks.
//!
//! Chunks are packed up to a token budget and overlap their predecessor by a
//! tail of whole segments, so that a passage cut at a boundary is still found
//! intact in one of the two neighbours.

mod packer;
mod tokens;

pub use packer::Chunker;
pub use tokens::{TiktokenCounter, TokenCounter, WordCounter};

use serde::{Deserialize, Serialize};

/// Separator between the video title and the chunk body.
pub const TITLE_SEPARATOR: &str = " | ";

/// A chunk of transcript text ready for embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `"<title> | <segment texts>"`.
    pub text: String,
    /// Start of the first segment, in seconds.
    pub start_time: f64,
    /// End of the last segment, in seconds.
    pub end_time: f64,
    /// Position in emission order, starting at 0.
    pub seq: u32,
}

impl Chunk {
    /// Duration of this chunk in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}
