//! In-memory vector store implementation.
//!
//! Useful for testing and one-off runs; nothing survives the process.

use super::{
    cosine_distance, rank, ChannelRecord, ChunkRecord, IndexedVideo, RankedMatch, StoreStats,
    VectorStore, VideoRecord,
};
use crate::chunking::Chunk;
use crate::error::{ChannelChatError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct StoredChunk {
    video_id: String,
    chunk: Chunk,
    embedding: Vec<f32>,
}

#[derive(Default)]
struct State {
    channels: HashMap<String, ChannelRecord>,
    videos: HashMap<String, VideoRecord>,
    chunks: BTreeMap<i64, StoredChunk>,
    last_chunk_id: i64,
}

/// In-memory vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    state: RwLock<State>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| ChannelChatError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| ChannelChatError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_channel(&self, channel: &ChannelRecord) -> Result<()> {
        self.write()?
            .channels
            .insert(channel.channel_id.clone(), channel.clone());
        Ok(())
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Option<ChannelRecord>> {
        Ok(self.read()?.channels.get(channel_id).cloned())
    }

    async fn list_channels(&self) -> Result<Vec<ChannelRecord>> {
        let mut channels: Vec<_> = self.read()?.channels.values().cloned().collect();
        channels.sort_by(|a, b| {
            b.indexed_at
                .cmp(&a.indexed_at)
                .then_with(|| a.channel_id.cmp(&b.channel_id))
        });
        Ok(channels)
    }

    async fn upsert_video(&self, video: &VideoRecord) -> Result<()> {
        let mut state = self.write()?;
        if let Some(channel_id) = &video.channel_id {
            if !state.channels.contains_key(channel_id) {
                return Err(ChannelChatError::VectorStore(format!(
                    "video {} references unknown channel {}",
                    video.video_id, channel_id
                )));
            }
        }
        state.videos.insert(video.video_id.clone(), video.clone());
        Ok(())
    }

    async fn get_video(&self, video_id: &str) -> Result<Option<VideoRecord>> {
        Ok(self.read()?.videos.get(video_id).cloned())
    }

    async fn video_exists(&self, video_id: &str) -> Result<bool> {
        Ok(self.read()?.videos.contains_key(video_id))
    }

    async fn list_videos(&self, channel_id: Option<&str>) -> Result<Vec<IndexedVideo>> {
        let state = self.read()?;

        let mut videos: Vec<IndexedVideo> = state
            .videos
            .values()
            .filter(|v| channel_id.is_none() || v.channel_id.as_deref() == channel_id)
            .map(|v| IndexedVideo {
                video: v.clone(),
                chunk_count: state
                    .chunks
                    .values()
                    .filter(|c| c.video_id == v.video_id)
                    .count(),
            })
            .collect();

        // Newest first, undated last.
        videos.sort_by(|a, b| {
            let (a, b) = (&a.video, &b.video);
            a.published_at
                .is_none()
                .cmp(&b.published_at.is_none())
                .then_with(|| b.published_at.cmp(&a.published_at))
                .then_with(|| a.video_id.cmp(&b.video_id))
        });

        Ok(videos)
    }

    async fn insert_chunk(&self, video_id: &str, chunk: &Chunk, embedding: &[f32]) -> Result<i64> {
        let mut state = self.write()?;
        if !state.videos.contains_key(video_id) {
            return Err(ChannelChatError::VectorStore(format!(
                "chunk references unknown video {}",
                video_id
            )));
        }
        state.last_chunk_id += 1;
        let chunk_id = state.last_chunk_id;
        state.chunks.insert(
            chunk_id,
            StoredChunk {
                video_id: video_id.to_string(),
                chunk: chunk.clone(),
                embedding: embedding.to_vec(),
            },
        );
        Ok(chunk_id)
    }

    async fn delete_chunks(&self, video_id: &str) -> Result<usize> {
        let mut state = self.write()?;
        let before = state.chunks.len();
        state.chunks.retain(|_, c| c.video_id != video_id);
        Ok(before - state.chunks.len())
    }

    async fn remove_video(&self, video_id: &str) -> Result<bool> {
        let mut state = self.write()?;
        state.chunks.retain(|_, c| c.video_id != video_id);
        Ok(state.videos.remove(video_id).is_some())
    }

    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<RankedMatch>> {
        let state = self.read()?;

        let matches = state
            .chunks
            .iter()
            .map(|(&chunk_id, stored)| {
                let video = state.videos.get(&stored.video_id);
                let channel_id = video.and_then(|v| v.channel_id.clone());
                let channel_name = channel_id
                    .as_deref()
                    .and_then(|id| state.channels.get(id))
                    .map(|c| c.name.clone());

                RankedMatch {
                    chunk: ChunkRecord {
                        chunk_id,
                        video_id: stored.video_id.clone(),
                        seq: stored.chunk.seq,
                        text: stored.chunk.text.clone(),
                        start_time: stored.chunk.start_time,
                        end_time: stored.chunk.end_time,
                        video_title: video.map(|v| v.title.clone()).unwrap_or_default(),
                        channel_id,
                        channel_name,
                    },
                    distance: cosine_distance(query, &stored.embedding),
                }
            })
            .collect();

        Ok(rank(matches, k))
    }

    async fn stats(&self) -> Result<StoreStats> {
        let state = self.read()?;
        Ok(StoreStats {
            channels: state.channels.len(),
            videos: state.videos.len(),
            chunks: state.chunks.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::TranscriptSource;

    fn video(id: &str, channel_id: Option<&str>, published_at: Option<&str>) -> VideoRecord {
        VideoRecord {
            video_id: id.to_string(),
            channel_id: channel_id.map(str::to_string),
            title: format!("Title {}", id),
            description: None,
            duration: None,
            published_at: published_at.map(str::to_string),
            thumbnail_url: None,
            transcript_source: TranscriptSource::Transcription,
        }
    }

    fn chunk(seq: u32) -> Chunk {
        Chunk {
            text: format!("T | chunk {}", seq),
            start_time: seq as f64,
            end_time: seq as f64 + 1.0,
            seq,
        }
    }

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();
        store
            .upsert_channel(&ChannelRecord::new("UC1", "One", "https://youtube.com/@one"))
            .await
            .unwrap();
        store.upsert_video(&video("a", Some("UC1"), Some("2024-01-01"))).await.unwrap();
        store.upsert_video(&video("b", None, None)).await.unwrap();

        let first = store.insert_chunk("a", &chunk(0), &[1.0, 0.0]).await.unwrap();
        let second = store.insert_chunk("a", &chunk(1), &[1.0, 0.0]).await.unwrap();
        store.insert_chunk("b", &chunk(0), &[0.0, 1.0]).await.unwrap();

        let results = store.nearest(&[1.0, 0.0], 3).await.unwrap();
        let ids: Vec<_> = results.iter().map(|m| m.chunk.chunk_id).collect();
        assert_eq!(ids[..2], [first, second]);
        assert_eq!(results[0].chunk.channel_name.as_deref(), Some("One"));
        assert!(results[2].chunk.channel_name.is_none());
        assert!((results[2].distance - 1.0).abs() < 1e-6);

        let videos = store.list_videos(None).await.unwrap();
        assert_eq!(videos[0].video.video_id, "a");
        assert_eq!(videos[0].chunk_count, 2);
        assert_eq!(store.list_videos(Some("UC1")).await.unwrap().len(), 1);

        assert_eq!(store.delete_chunks("a").await.unwrap(), 2);
        assert!(store.remove_video("b").await.unwrap());
        assert_eq!(
            store.stats().await.unwrap(),
            StoreStats { channels: 1, videos: 1, chunks: 0 }
        );
    }

    #[tokio::test]
    async fn test_chunk_ids_are_not_reused() {
        let store = MemoryVectorStore::new();
        store.upsert_video(&video("a", None, None)).await.unwrap();
        let first = store.insert_chunk("a", &chunk(0), &[1.0]).await.unwrap();
        store.delete_chunks("a").await.unwrap();
        let second = store.insert_chunk("a", &chunk(0), &[1.0]).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_enforces_references() {
        let store = MemoryVectorStore::new();

        let err = store.upsert_video(&video("v", Some("UC404"), None)).await.unwrap_err();
        assert!(matches!(err, ChannelChatError::VectorStore(_)));
        assert!(!store.video_exists("v").await.unwrap());

        let err = store.insert_chunk("v", &chunk(0), &[1.0]).await.unwrap_err();
        assert!(matches!(err, ChannelChatError::VectorStore(_)));
        assert_eq!(store.stats().await.unwrap(), StoreStats::default());
    }
}
