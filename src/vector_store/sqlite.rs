//! SQLite-based vector store implementation.
//!
//! Embeddings are stored as little-endian `f32` BLOBs next to their chunk and
//! ranked with cosine distance computed in Rust over a full scan.

use super::{
    cosine_distance, rank, ChannelRecord, ChunkRecord, IndexedVideo, RankedMatch, StoreStats,
    TranscriptSource, VectorStore, VideoRecord,
};
use crate::chunking::Chunk;
use crate::error::{ChannelChatError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

/// Videos must name a stored channel (or none), chunks a stored video.
const PRAGMAS: &str = "PRAGMA foreign_keys=ON;";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS channels (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        url TEXT NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS videos (
        id TEXT PRIMARY KEY,
        channel_id TEXT REFERENCES channels(id),
        title TEXT NOT NULL,
        description TEXT,
        duration REAL,
        published_at TEXT,
        thumbnail_url TEXT,
        transcript_source TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chunks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        video_id TEXT NOT NULL REFERENCES videos(id),
        seq INTEGER NOT NULL,
        start_time REAL NOT NULL,
        end_time REAL NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_video_id ON chunks(video_id);
    CREATE INDEX IF NOT EXISTS idx_videos_channel_id ON videos(channel_id);
"#;

const VIDEO_COLUMNS: &str = "v.id, v.channel_id, v.title, v.description, v.duration, \
                             v.published_at, v.thumbnail_url, v.transcript_source";

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(PRAGMAS)?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(PRAGMAS)?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ChannelChatError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<ChannelRecord> {
    let indexed_at: String = row.get(3)?;
    Ok(ChannelRecord {
        channel_id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        indexed_at: parse_timestamp(&indexed_at),
    })
}

/// Map the columns of [`VIDEO_COLUMNS`].
fn video_from_row(row: &Row<'_>) -> rusqlite::Result<VideoRecord> {
    let source: String = row.get(7)?;
    let transcript_source = source
        .parse::<TranscriptSource>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, e.into()))?;

    Ok(VideoRecord {
        video_id: row.get(0)?,
        channel_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        duration: row.get(4)?,
        published_at: row.get(5)?,
        thumbnail_url: row.get(6)?,
        transcript_source,
    })
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, channel), fields(channel_id = %channel.channel_id))]
    async fn upsert_channel(&self, channel: &ChannelRecord) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO channels (id, name, url, indexed_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                url = excluded.url,
                indexed_at = excluded.indexed_at
            "#,
            params![
                channel.channel_id,
                channel.name,
                channel.url,
                channel.indexed_at.to_rfc3339()
            ],
        )?;
        debug!("Upserted channel {}", channel.channel_id);
        Ok(())
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Option<ChannelRecord>> {
        let conn = self.conn()?;
        let channel = conn
            .query_row(
                "SELECT id, name, url, indexed_at FROM channels WHERE id = ?1",
                params![channel_id],
                channel_from_row,
            )
            .optional()?;
        Ok(channel)
    }

    async fn list_channels(&self) -> Result<Vec<ChannelRecord>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, url, indexed_at FROM channels ORDER BY indexed_at DESC, id")?;
        let channels = stmt
            .query_map([], channel_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(channels)
    }

    #[instrument(skip(self, video), fields(video_id = %video.video_id))]
    async fn upsert_video(&self, video: &VideoRecord) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO videos (id, channel_id, title, description, duration,
                                published_at, thumbnail_url, transcript_source)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                channel_id = excluded.channel_id,
                title = excluded.title,
                description = excluded.description,
                duration = excluded.duration,
                published_at = excluded.published_at,
                thumbnail_url = excluded.thumbnail_url,
                transcript_source = excluded.transcript_source
            "#,
            params![
                video.video_id,
                video.channel_id,
                video.title,
                video.description,
                video.duration,
                video.published_at,
                video.thumbnail_url,
                video.transcript_source.as_str(),
            ],
        )?;
        debug!("Upserted video {}", video.video_id);
        Ok(())
    }

    async fn get_video(&self, video_id: &str) -> Result<Option<VideoRecord>> {
        let conn = self.conn()?;
        let video = conn
            .query_row(
                &format!("SELECT {} FROM videos v WHERE v.id = ?1", VIDEO_COLUMNS),
                params![video_id],
                video_from_row,
            )
            .optional()?;
        Ok(video)
    }

    async fn video_exists(&self, video_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM videos WHERE id = ?1",
            params![video_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn list_videos(&self, channel_id: Option<&str>) -> Result<Vec<IndexedVideo>> {
        let conn = self.conn()?;
        let sql = format!(
            r#"
            SELECT {}, COUNT(c.id)
            FROM videos v
            LEFT JOIN chunks c ON c.video_id = v.id
            WHERE ?1 IS NULL OR v.channel_id = ?1
            GROUP BY v.id
            ORDER BY v.published_at IS NULL, v.published_at DESC, v.id
            "#,
            VIDEO_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let videos = stmt
            .query_map(params![channel_id], |row| {
                let chunk_count: i64 = row.get(8)?;
                Ok(IndexedVideo {
                    video: video_from_row(row)?,
                    chunk_count: chunk_count as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(videos)
    }

    #[instrument(skip(self, chunk, embedding), fields(seq = chunk.seq))]
    async fn insert_chunk(&self, video_id: &str, chunk: &Chunk, embedding: &[f32]) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO chunks (video_id, seq, start_time, end_time, text, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                video_id,
                chunk.seq,
                chunk.start_time,
                chunk.end_time,
                chunk.text,
                Self::embedding_to_bytes(embedding),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    #[instrument(skip(self))]
    async fn delete_chunks(&self, video_id: &str) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM chunks WHERE video_id = ?1", params![video_id])?;
        debug!("Deleted {} chunks for video {}", deleted, video_id);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn remove_video(&self, video_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        let chunks = tx.execute("DELETE FROM chunks WHERE video_id = ?1", params![video_id])?;
        let videos = tx.execute("DELETE FROM videos WHERE id = ?1", params![video_id])?;
        tx.commit()?;

        info!("Removed video {} ({} chunks)", video_id, chunks);
        Ok(videos > 0)
    }

    #[instrument(skip(self, query), fields(dims = query.len()))]
    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<RankedMatch>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT c.id, c.video_id, c.seq, c.text, c.start_time, c.end_time, c.embedding,
                   COALESCE(v.title, ''), v.channel_id, ch.name
            FROM chunks c
            LEFT JOIN videos v ON v.id = c.video_id
            LEFT JOIN channels ch ON ch.id = v.channel_id
            "#,
        )?;

        let matches = stmt
            .query_map([], |row| {
                let embedding: Vec<u8> = row.get(6)?;
                let chunk = ChunkRecord {
                    chunk_id: row.get(0)?,
                    video_id: row.get(1)?,
                    seq: row.get(2)?,
                    text: row.get(3)?,
                    start_time: row.get(4)?,
                    end_time: row.get(5)?,
                    video_title: row.get(7)?,
                    channel_id: row.get(8)?,
                    channel_name: row.get(9)?,
                };
                let distance = cosine_distance(query, &Self::bytes_to_embedding(&embedding));
                Ok(RankedMatch { chunk, distance })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let ranked = rank(matches, k);
        debug!("Ranked {} nearest chunks", ranked.len());
        Ok(ranked)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;
        let count = |table: &str| -> Result<usize> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(StoreStats {
            channels: count("channels")?,
            videos: count("videos")?,
            chunks: count("chunks")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, channel_id: Option<&str>, published_at: Option<&str>) -> VideoRecord {
        VideoRecord {
            video_id: id.to_string(),
            channel_id: channel_id.map(str::to_string),
            title: format!("Title {}", id),
            description: None,
            duration: Some(120.0),
            published_at: published_at.map(str::to_string),
            thumbnail_url: None,
            transcript_source: TranscriptSource::Subtitles,
        }
    }

    fn chunk(seq: u32, text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            start_time: seq as f64 * 10.0,
            end_time: seq as f64 * 10.0 + 10.0,
            seq,
        }
    }

    #[test]
    fn test_embedding_bytes_are_little_endian() {
        let bytes = SqliteVectorStore::embedding_to_bytes(&[1.0, -2.5]);
        assert_eq!(&bytes[..4], &1.0f32.to_le_bytes());
        assert_eq!(SqliteVectorStore::bytes_to_embedding(&bytes), vec![1.0, -2.5]);
    }

    #[tokio::test]
    async fn test_sqlite_vector_store() {
        let store = SqliteVectorStore::in_memory().unwrap();

        store
            .upsert_channel(&ChannelRecord::new("UC1", "Channel One", "https://youtube.com/@one"))
            .await
            .unwrap();
        store.upsert_video(&video("vid1", Some("UC1"), Some("2024-01-02"))).await.unwrap();

        let a = store.insert_chunk("vid1", &chunk(0, "Title vid1 | alpha"), &[1.0, 0.0]).await.unwrap();
        let b = store.insert_chunk("vid1", &chunk(1, "Title vid1 | beta"), &[0.0, 1.0]).await.unwrap();
        assert!(b > a);

        let results = store.nearest(&[1.0, 0.1], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.chunk_id, a);
        assert!(results[0].distance < results[1].distance);
        assert_eq!(results[0].chunk.channel_name.as_deref(), Some("Channel One"));
        assert_eq!(results[0].chunk.video_title, "Title vid1");

        let stats = store.stats().await.unwrap();
        assert_eq!(stats, StoreStats { channels: 1, videos: 1, chunks: 2 });

        assert_eq!(store.delete_chunks("vid1").await.unwrap(), 2);
        assert!(store.nearest(&[1.0, 0.0], 10).await.unwrap().is_empty());
        assert!(store.video_exists("vid1").await.unwrap());
    }

    #[tokio::test]
    async fn test_nearest_ties_and_limit() {
        let store = SqliteVectorStore::in_memory().unwrap();
        store.upsert_video(&video("v", None, None)).await.unwrap();

        let first = store.insert_chunk("v", &chunk(0, "a"), &[1.0, 0.0]).await.unwrap();
        let second = store.insert_chunk("v", &chunk(1, "b"), &[2.0, 0.0]).await.unwrap();
        store.insert_chunk("v", &chunk(2, "c"), &[0.0, 1.0]).await.unwrap();

        let results = store.nearest(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<_> = results.iter().map(|m| m.chunk.chunk_id).collect();
        assert_eq!(ids, vec![first, second]);
        assert!(results[0].chunk.channel_id.is_none());

        assert!(store.nearest(&[1.0, 0.0], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_video_listing_and_removal() {
        let store = SqliteVectorStore::in_memory().unwrap();
        for id in ["UC1", "UC2"] {
            store
                .upsert_channel(&ChannelRecord::new(id, id, format!("https://youtube.com/channel/{}", id)))
                .await
                .unwrap();
        }
        store.upsert_video(&video("old", Some("UC1"), Some("2023-05-01"))).await.unwrap();
        store.upsert_video(&video("new", Some("UC1"), Some("2024-05-01"))).await.unwrap();
        store.upsert_video(&video("other", Some("UC2"), None)).await.unwrap();
        store.insert_chunk("new", &chunk(0, "x"), &[1.0]).await.unwrap();

        let all = store.list_videos(None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|v| v.video.video_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "other"]);
        assert_eq!(all[0].chunk_count, 1);
        assert_eq!(all[1].chunk_count, 0);

        let uc1 = store.list_videos(Some("UC1")).await.unwrap();
        assert_eq!(uc1.len(), 2);

        assert!(store.remove_video("new").await.unwrap());
        assert!(!store.remove_video("new").await.unwrap());
        assert_eq!(store.stats().await.unwrap().chunks, 0);
        assert!(store.get_video("new").await.unwrap().is_none());
        assert_eq!(
            store.get_video("old").await.unwrap().unwrap().published_at.as_deref(),
            Some("2023-05-01")
        );
    }

    #[tokio::test]
    async fn test_rejects_video_of_unknown_channel() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let err = store
            .upsert_video(&video("v", Some("UC404"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelChatError::Database(_)));
        assert!(!store.video_exists("v").await.unwrap());
    }

    #[tokio::test]
    async fn test_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");

        {
            let store = SqliteVectorStore::new(&path).unwrap();
            store
                .upsert_channel(&ChannelRecord::new("UC1", "One", "https://youtube.com/@one"))
                .await
                .unwrap();
        }

        let store = SqliteVectorStore::new(&path).unwrap();
        let channels = store.list_channels().await.unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(store.get_channel("UC1").await.unwrap().unwrap().name, "One");
        assert!(store.get_channel("UC2").await.unwrap().is_none());
    }
}
