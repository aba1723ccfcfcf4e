//! Persistent storage for channels, videos and embedded chunks.
//!
//! Provides a trait-based interface with SQLite and in-memory backends. Both
//! rank by a linear cosine scan.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::chunking::Chunk;
use crate::config::Settings;
use crate::error::{ChannelChatError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Where a video's transcript came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptSource {
    /// Subtitles downloaded alongside the video.
    Subtitles,
    /// Speech-to-text over the downloaded audio.
    Transcription,
    /// A local subtitle file supplied by the user.
    File,
}

impl TranscriptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptSource::Subtitles => "subtitles",
            TranscriptSource::Transcription => "transcription",
            TranscriptSource::File => "file",
        }
    }
}

impl std::str::FromStr for TranscriptSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "subtitles" => Ok(TranscriptSource::Subtitles),
            "transcription" => Ok(TranscriptSource::Transcription),
            "file" => Ok(TranscriptSource::File),
            _ => Err(format!("Unknown transcript source: {}", s)),
        }
    }
}

impl std::fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub channel_id: String,
    pub name: String,
    pub url: String,
    pub indexed_at: DateTime<Utc>,
}

impl ChannelRecord {
    pub fn new(channel_id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            name: name.into(),
            url: url.into(),
            indexed_at: Utc::now(),
        }
    }
}

/// A stored video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub channel_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    /// Duration in seconds.
    pub duration: Option<f64>,
    /// Publication date as `YYYY-MM-DD`.
    pub published_at: Option<String>,
    pub thumbnail_url: Option<String>,
    pub transcript_source: TranscriptSource,
}

/// A video with the number of chunks stored for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedVideo {
    pub video: VideoRecord,
    pub chunk_count: usize,
}

/// A stored chunk joined with its video and channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: i64,
    pub video_id: String,
    pub seq: u32,
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
    pub video_title: String,
    pub channel_id: Option<String>,
    pub channel_name: Option<String>,
}

/// A chunk ranked against a query vector.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedMatch {
    pub chunk: ChunkRecord,
    /// Cosine distance, `1 - cosine_similarity`, in `[0, 2]`.
    pub distance: f64,
}

/// Row counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub channels: usize,
    pub videos: usize,
    pub chunks: usize,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or update a channel.
    async fn upsert_channel(&self, channel: &ChannelRecord) -> Result<()>;

    /// Get a channel by ID.
    async fn get_channel(&self, channel_id: &str) -> Result<Option<ChannelRecord>>;

    /// List channels, most recently indexed first.
    async fn list_channels(&self) -> Result<Vec<ChannelRecord>>;

    /// Insert or update a video.
    async fn upsert_video(&self, video: &VideoRecord) -> Result<()>;

    /// Get a video by ID.
    async fn get_video(&self, video_id: &str) -> Result<Option<VideoRecord>>;

    /// Check if a video is stored.
    async fn video_exists(&self, video_id: &str) -> Result<bool>;

    /// List videos, optionally for one channel, newest publication first.
    async fn list_videos(&self, channel_id: Option<&str>) -> Result<Vec<IndexedVideo>>;

    /// Store a chunk with its embedding, returning the assigned chunk ID.
    async fn insert_chunk(&self, video_id: &str, chunk: &Chunk, embedding: &[f32]) -> Result<i64>;

    /// Delete all chunks of a video, returning how many were removed.
    async fn delete_chunks(&self, video_id: &str) -> Result<usize>;

    /// Delete a video and its chunks. Returns false if the video was unknown.
    async fn remove_video(&self, video_id: &str) -> Result<bool>;

    /// The `k` chunks closest to `query`, by ascending cosine distance and
    /// then ascending chunk ID.
    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<RankedMatch>>;

    /// Count channels, videos and chunks.
    async fn stats(&self) -> Result<StoreStats>;
}

/// Open the store selected by `vector_store.provider`.
pub fn open_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    match settings.vector_store.provider.as_str() {
        "sqlite" => Ok(Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?)),
        "memory" => Ok(Arc::new(MemoryVectorStore::new())),
        other => Err(ChannelChatError::Config(format!(
            "Unknown vector store provider: {}. Use sqlite or memory.",
            other
        ))),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Cosine distance in `[0, 2]`. Vectors of different length, or zero vectors,
/// are at distance 1.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    (1.0 - cosine_similarity(a, b) as f64).clamp(0.0, 2.0)
}

/// Order matches by distance, then chunk ID, and keep the first `k`.
pub(crate) fn rank(mut matches: Vec<RankedMatch>, k: usize) -> Vec<RankedMatch> {
    matches.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal)
            .then(a.chunk.chunk_id.cmp(&b.chunk.chunk_id))
    });
    matches.truncate(k);
    matches
}
