//! Indexing pipeline.
//!
//! Coordinates the path from a channel or video ID to embedded chunks in the
//! vector store: fetch metadata, obtain a transcript, normalize, chunk, embed
//! and store.

use crate::chunking::Chunker;
use crate::config::{NormalizationSettings, Settings};
use crate::embedding::{BatchingEmbedder, Embedder, OpenAIEmbedder};
use crate::error::{ChannelChatError, Result};
use crate::search::Searcher;
use crate::source::{normalize_channel_url, ChannelInfo, ContentFetcher, VideoInfo, YtDlpFetcher};
use crate::subtitles::{parse_subtitle_str, parse_subtitles, SubtitleFormat};
use crate::transcription::{normalize_segments, ElevenLabsTranscriber, Segment, Transcriber};
use crate::vector_store::{open_store, ChannelRecord, TranscriptSource, VectorStore, VideoRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

/// Name recorded for channels whose metadata cannot be fetched.
const UNKNOWN_CHANNEL: &str = "Unknown Channel";

/// What happened to a single video.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOutcome {
    Indexed {
        video_id: String,
        title: String,
        chunks: usize,
        source: TranscriptSource,
    },
    Skipped {
        video_id: String,
        reason: String,
    },
}

/// Summary of a channel run.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelIndexReport {
    pub channel: ChannelInfo,
    /// Videos listed for the channel.
    pub found: usize,
    /// Listed videos that were already in the store.
    pub already_indexed: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// The indexing pipeline.
pub struct Indexer {
    fetcher: Arc<dyn ContentFetcher>,
    transcriber: Option<Arc<dyn Transcriber>>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    chunker: Chunker,
    normalization: NormalizationSettings,
    temp_dir: PathBuf,
}

impl Indexer {
    /// Create an indexer from explicit components.
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        chunker: Chunker,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            transcriber: None,
            embedder,
            store,
            chunker,
            normalization: NormalizationSettings::default(),
            temp_dir: temp_dir.into(),
        }
    }

    /// Transcribe audio for videos without subtitles.
    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_normalization(mut self, normalization: NormalizationSettings) -> Self {
        self.normalization = normalization;
        self
    }

    /// Build the production pipeline from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let embedder = BatchingEmbedder::from_settings(
            OpenAIEmbedder::with_config(
                &settings.embedding.model,
                settings.embedding.dimensions as usize,
            )?,
            &settings.embedding,
        );

        let mut indexer = Self::new(
            Arc::new(YtDlpFetcher::new()),
            Arc::new(embedder),
            open_store(settings)?,
            Chunker::from_settings(&settings.chunking)?,
            settings.temp_dir(),
        )
        .with_normalization(settings.normalization.clone());

        if settings.transcription.enabled {
            match ElevenLabsTranscriber::from_env(&settings.transcription.model_id)? {
                Some(transcriber) => indexer = indexer.with_transcriber(Arc::new(transcriber)),
                None => debug!("No transcription API key set; videos without subtitles will be skipped"),
            }
        }

        Ok(indexer)
    }

    pub fn store(&self) -> Arc<dyn VectorStore> {
        self.store.clone()
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// A searcher over the same embedder and store.
    pub fn searcher(&self) -> Searcher {
        Searcher::new(self.embedder.clone(), self.store.clone())
    }

    /// Index a single video, replacing any chunks already stored for it.
    #[instrument(skip(self))]
    pub async fn index_video(&self, video_id: &str, channel_id: Option<&str>) -> Result<IndexOutcome> {
        let info = self.fetcher.video_info(video_id).await?;

        // A re-index keeps the channel the video was stored under.
        let channel_id = match channel_id {
            Some(id) => Some(id.to_string()),
            None => match self.store.get_video(video_id).await? {
                Some(existing) => existing.channel_id,
                None => info.channel_id.clone(),
            },
        };

        if let Some(id) = channel_id.as_deref() {
            self.ensure_channel(id).await?;
        }

        let scratch = self.scratch_dir()?;
        let Some((segments, source)) = self.fetch_transcript(video_id, scratch.path()).await? else {
            info!("No transcript available for {}", video_id);
            return Ok(IndexOutcome::Skipped {
                video_id: video_id.to_string(),
                reason: "no transcript".to_string(),
            });
        };

        self.store_segments(&info, channel_id, &segments, source).await
    }

    /// Index the uploads of a channel that are not yet stored.
    ///
    /// Failures of individual videos are logged and counted; only errors
    /// resolving the channel itself abort the run.
    #[instrument(skip(self))]
    pub async fn add_channel(&self, url: &str, limit: Option<usize>) -> Result<ChannelIndexReport> {
        let url = normalize_channel_url(url)?;
        let channel = self.fetcher.channel_info(&url).await?;
        info!("Indexing channel {} ({})", channel.name, channel.channel_id);

        self.store
            .upsert_channel(&ChannelRecord::new(
                &channel.channel_id,
                &channel.name,
                &channel.url,
            ))
            .await?;

        let listed = self.fetcher.channel_videos(&url).await?;
        let found = listed.len();

        let mut pending = Vec::with_capacity(found);
        for id in listed {
            if !self.store.video_exists(&id).await? {
                pending.push(id);
            }
        }
        let already_indexed = found - pending.len();
        if let Some(limit) = limit {
            pending.truncate(limit);
        }

        info!(
            "{} videos listed, {} already indexed, {} to index",
            found,
            already_indexed,
            pending.len()
        );

        let mut report = ChannelIndexReport {
            channel,
            found,
            already_indexed,
            indexed: 0,
            skipped: 0,
            failed: 0,
        };

        for (i, video_id) in pending.iter().enumerate() {
            debug!("[{}/{}] {}", i + 1, pending.len(), video_id);
            match self
                .index_video(video_id, Some(&report.channel.channel_id))
                .await
            {
                Ok(IndexOutcome::Indexed { chunks, .. }) => {
                    info!("Indexed {} ({} chunks)", video_id, chunks);
                    report.indexed += 1;
                }
                Ok(IndexOutcome::Skipped { reason, .. }) => {
                    info!("Skipped {}: {}", video_id, reason);
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!("Failed to index {}: {}", video_id, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Index a local subtitle file under the given video metadata.
    #[instrument(skip(self, video, channel), fields(path = %path.display(), video_id = %video.id))]
    pub async fn ingest_file(
        &self,
        path: &Path,
        format: Option<SubtitleFormat>,
        video: VideoInfo,
        channel: Option<ChannelInfo>,
    ) -> Result<IndexOutcome> {
        let segments = match format {
            Some(format) => parse_subtitle_str(&std::fs::read_to_string(path)?, format)?,
            None => parse_subtitles(path)?,
        };

        let channel_id = match channel {
            Some(channel) => {
                self.store
                    .upsert_channel(&ChannelRecord::new(
                        &channel.channel_id,
                        &channel.name,
                        &channel.url,
                    ))
                    .await?;
                Some(channel.channel_id)
            }
            None => {
                if let Some(id) = video.channel_id.as_deref() {
                    self.ensure_channel(id).await?;
                }
                video.channel_id.clone()
            }
        };

        self.store_segments(&video, channel_id, &segments, TranscriptSource::File)
            .await
    }

    /// Subtitles first, then transcription when a transcriber is configured.
    async fn fetch_transcript(
        &self,
        video_id: &str,
        dir: &Path,
    ) -> Result<Option<(Vec<Segment>, TranscriptSource)>> {
        if let Some(path) = self.fetcher.download_subtitles(video_id, dir).await? {
            let segments = parse_subtitles(&path)?;
            return Ok(Some((segments, TranscriptSource::Subtitles)));
        }

        let Some(transcriber) = &self.transcriber else {
            return Ok(None);
        };

        info!("No subtitles for {}, transcribing audio", video_id);
        let audio = self.fetcher.download_audio(video_id, dir).await?;
        let segments = transcriber.transcribe(&audio).await?;
        Ok(Some((segments, TranscriptSource::Transcription)))
    }

    /// Normalize, chunk, embed and store. Nothing is written unless every
    /// chunk was embedded.
    async fn store_segments(
        &self,
        info: &VideoInfo,
        channel_id: Option<String>,
        segments: &[Segment],
        source: TranscriptSource,
    ) -> Result<IndexOutcome> {
        let segments = normalize_segments(
            segments,
            self.normalization.min_duration,
            self.normalization.merge_gap,
        );
        let chunks = self.chunker.chunk(&segments, &info.title);

        if chunks.is_empty() {
            return Ok(IndexOutcome::Skipped {
                video_id: info.id.clone(),
                reason: "empty transcript".to_string(),
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(ChannelChatError::Embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        self.store
            .upsert_video(&VideoRecord {
                video_id: info.id.clone(),
                channel_id,
                title: info.title.clone(),
                description: info.description.clone(),
                duration: info.duration,
                published_at: info.published_at.clone(),
                thumbnail_url: info.thumbnail_url.clone(),
                transcript_source: source,
            })
            .await?;

        let removed = self.store.delete_chunks(&info.id).await?;
        if removed > 0 {
            debug!("Replaced {} existing chunks", removed);
        }

        for (chunk, embedding) in chunks.iter().zip(&embeddings) {
            self.store.insert_chunk(&info.id, chunk, embedding).await?;
        }

        Ok(IndexOutcome::Indexed {
            video_id: info.id.clone(),
            title: info.title.clone(),
            chunks: chunks.len(),
            source,
        })
    }

    /// Make sure a channel row exists before videos reference it.
    async fn ensure_channel(&self, channel_id: &str) -> Result<()> {
        if self.store.get_channel(channel_id).await?.is_some() {
            return Ok(());
        }

        let url = format!("https://www.youtube.com/channel/{}", channel_id);
        let record = match self.fetcher.channel_info(&url).await {
            Ok(info) => ChannelRecord::new(channel_id, info.name, info.url),
            Err(e) => {
                warn!("Could not fetch channel {}: {}", channel_id, e);
                ChannelRecord::new(channel_id, UNKNOWN_CHANNEL, "")
            }
        };
        self.store.upsert_channel(&record).await
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        std::fs::create_dir_all(&self.temp_dir)?;
        Ok(tempfile::Builder::new()
            .prefix("run-")
            .tempdir_in(&self.temp_dir)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::WordCounter;
    use crate::test_support::{FakeEmbedder, FakeFetcher, FakeTranscriber};
    use crate::vector_store::{MemoryVectorStore, SqliteVectorStore, StoreStats};

    const CHANNEL_URL: &str = "https://www.youtube.com/@chan";

    const VTT: &str = "WEBVTT

00:00:00.000 --> 00:00:02.000
hello there

00:00:02.000 --> 00:00:04.000
general kenobi
";

    fn channel() -> ChannelInfo {
        ChannelInfo {
            channel_id: "UC1".to_string(),
            name: "Chan".to_string(),
            url: CHANNEL_URL.to_string(),
        }
    }

    fn video(id: &str) -> VideoInfo {
        let mut info = VideoInfo::new(id, format!("Video {}", id));
        info.channel_id = Some("UC1".to_string());
        info
    }

    fn indexer(
        fetcher: FakeFetcher,
        embedder: FakeEmbedder,
        store: Arc<MemoryVectorStore>,
        temp: &Path,
    ) -> Indexer {
        let chunker = Chunker::new(Arc::new(WordCounter), 50, 0.1).unwrap();
        Indexer::new(Arc::new(fetcher), Arc::new(embedder), store, chunker, temp)
    }

    #[tokio::test]
    async fn test_index_video_from_subtitles() {
        let temp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryVectorStore::new());
        let fetcher = FakeFetcher::new()
            .with_channel("https://www.youtube.com/channel/UC1", channel(), &[])
            .with_video(video("a"))
            .with_subtitles("a", VTT);
        let indexer = indexer(fetcher, FakeEmbedder::new(4), store.clone(), temp.path());

        let outcome = indexer.index_video("a", None).await.unwrap();

        assert_eq!(
            outcome,
            IndexOutcome::Indexed {
                video_id: "a".to_string(),
                title: "Video a".to_string(),
                chunks: 1,
                source: TranscriptSource::Subtitles,
            }
        );
        let stored = store.get_video("a").await.unwrap().unwrap();
        assert_eq!(stored.channel_id.as_deref(), Some("UC1"));
        assert_eq!(store.get_channel("UC1").await.unwrap().unwrap().name, "Chan");

        let hits = store.nearest(&FakeEmbedder::vector_for("x", 4), 5).await.unwrap();
        assert_eq!(hits[0].chunk.text, "Video a | hello there general kenobi");

        // The per-run directory is cleaned up.
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_reindex_replaces_chunks() {
        let temp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryVectorStore::new());
        let fetcher = FakeFetcher::new().with_video(video("a")).with_subtitles("a", VTT);
        let indexer = indexer(fetcher, FakeEmbedder::new(4), store.clone(), temp.path());

        indexer.index_video("a", None).await.unwrap();
        indexer.index_video("a", None).await.unwrap();

        assert_eq!(store.stats().await.unwrap().chunks, 1);
        // Channel lookup failed, so a placeholder was recorded.
        let channel = store.get_channel("UC1").await.unwrap().unwrap();
        assert_eq!(channel.name, UNKNOWN_CHANNEL);
        assert_eq!(channel.url, "");
    }

    #[tokio::test]
    async fn test_reindex_keeps_stored_channel() {
        let temp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryVectorStore::new());
        let fetcher = FakeFetcher::new().with_video(video("a")).with_subtitles("a", VTT);
        let indexer = indexer(fetcher, FakeEmbedder::new(4), store.clone(), temp.path());

        indexer.index_video("a", Some("UC7")).await.unwrap();
        indexer.index_video("a", None).await.unwrap();

        let stored = store.get_video("a").await.unwrap().unwrap();
        assert_eq!(stored.channel_id.as_deref(), Some("UC7"));
        assert!(store.get_channel("UC1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_video_without_transcript_is_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryVectorStore::new());
        let fetcher = FakeFetcher::new().with_video(video("a")).with_audio("a");
        let indexer = indexer(fetcher, FakeEmbedder::new(4), store.clone(), temp.path());

        let outcome = indexer.index_video("a", None).await.unwrap();

        assert_eq!(
            outcome,
            IndexOutcome::Skipped {
                video_id: "a".to_string(),
                reason: "no transcript".to_string(),
            }
        );
        assert!(!store.video_exists("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_falls_back_to_transcription() {
        let temp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryVectorStore::new());
        let fetcher = Arc::new(FakeFetcher::new().with_video(video("a")).with_audio("a"));
        let transcriber = FakeTranscriber::new(vec![
            Segment::new("spoken words here", 0.0, 3.0),
            Segment::new("and more", 3.0, 5.0),
        ]);
        let chunker = Chunker::new(Arc::new(WordCounter), 50, 0.1).unwrap();
        let indexer = Indexer::new(
            fetcher.clone(),
            Arc::new(FakeEmbedder::new(4)),
            store.clone(),
            chunker,
            temp.path(),
        )
        .with_transcriber(Arc::new(transcriber));

        let outcome = indexer.index_video("a", None).await.unwrap();

        assert!(matches!(
            outcome,
            IndexOutcome::Indexed { source: TranscriptSource::Transcription, chunks: 1, .. }
        ));
        assert_eq!(fetcher.downloads(), vec!["subs:a", "audio:a"]);
        assert_eq!(
            store.get_video("a").await.unwrap().unwrap().transcript_source,
            TranscriptSource::Transcription
        );
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_store_untouched() {
        let temp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryVectorStore::new());
        let fetcher = FakeFetcher::new().with_video(video("a")).with_subtitles("a", VTT);
        let embedder = FakeEmbedder::new(4).fail_with(ChannelChatError::Embedding("boom".to_string()));
        let indexer = indexer(fetcher, embedder, store.clone(), temp.path());

        let err = indexer.index_video("a", Some("UC1")).await.unwrap_err();

        assert!(matches!(err, ChannelChatError::Embedding(_)));
        assert!(!store.video_exists("a").await.unwrap());
        assert_eq!(store.stats().await.unwrap().chunks, 0);
    }

    #[tokio::test]
    async fn test_short_embedding_response_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryVectorStore::new());
        let fetcher = FakeFetcher::new().with_video(video("a")).with_subtitles("a", VTT);
        let indexer = indexer(fetcher, FakeEmbedder::new(4).drop_last(), store.clone(), temp.path());

        let err = indexer.index_video("a", None).await.unwrap_err();
        assert!(err.to_string().contains("expected 1 embeddings, got 0"));
        assert!(!store.video_exists("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_channel_counts_outcomes() {
        let temp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryVectorStore::new());
        let fetcher = FakeFetcher::new()
            .with_channel(CHANNEL_URL, channel(), &["old", "b", "missing", "silent"])
            .with_video(video("old"))
            .with_video(video("b"))
            .with_video(video("silent"))
            .with_subtitles("old", VTT)
            .with_subtitles("b", VTT);
        let indexer = indexer(fetcher, FakeEmbedder::new(4), store.clone(), temp.path());
        indexer.index_video("old", None).await.unwrap();

        let report = indexer.add_channel("https://www.youtube.com/@chan/", None).await.unwrap();

        assert_eq!(report.channel, channel());
        assert_eq!(report.found, 4);
        assert_eq!(report.already_indexed, 1);
        assert_eq!(report.indexed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(
            store.stats().await.unwrap(),
            StoreStats { channels: 1, videos: 2, chunks: 2 }
        );
        assert_eq!(store.get_channel("UC1").await.unwrap().unwrap().url, CHANNEL_URL);
    }

    #[tokio::test]
    async fn test_add_channel_limit_applies_after_filtering() {
        let temp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryVectorStore::new());
        let fetcher = FakeFetcher::new()
            .with_channel(CHANNEL_URL, channel(), &["old", "b", "c"])
            .with_video(video("old"))
            .with_video(video("b"))
            .with_video(video("c"))
            .with_subtitles("old", VTT)
            .with_subtitles("b", VTT)
            .with_subtitles("c", VTT);
        let indexer = indexer(fetcher, FakeEmbedder::new(4), store.clone(), temp.path());
        indexer.index_video("old", None).await.unwrap();

        let report = indexer.add_channel("@chan", Some(1)).await.unwrap();

        assert_eq!(report.indexed, 1);
        assert!(store.video_exists("b").await.unwrap());
        assert!(!store.video_exists("c").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_unknown_channel_fails() {
        let temp = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryVectorStore::new());
        let indexer = indexer(FakeFetcher::new(), FakeEmbedder::new(4), store, temp.path());

        let err = indexer.add_channel("@nobody", None).await.unwrap_err();
        assert!(matches!(err, ChannelChatError::ChannelNotFound(_)));
    }

    #[tokio::test]
    async fn test_ingest_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("talk.txt");
        std::fs::write(
            &path,
            "1\n00:00:01,000 --> 00:00:03,000\nfirst line\n\n2\n00:00:03,000 --> 00:00:05,000\nsecond line\n",
        )
        .unwrap();

        let store = Arc::new(MemoryVectorStore::new());
        let indexer = indexer(FakeFetcher::new(), FakeEmbedder::new(4), store.clone(), temp.path());

        let outcome = indexer
            .ingest_file(&path, Some(SubtitleFormat::Srt), VideoInfo::new("local1", "Talk"), Some(channel()))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            IndexOutcome::Indexed { source: TranscriptSource::File, chunks: 1, .. }
        ));
        let stored = store.get_video("local1").await.unwrap().unwrap();
        assert_eq!(stored.channel_id.as_deref(), Some("UC1"));
        assert!(store.get_channel("UC1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_ingest_file_records_channel_named_by_video() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("talk.vtt");
        std::fs::write(&path, VTT).unwrap();

        let store = Arc::new(SqliteVectorStore::in_memory().unwrap());
        let chunker = Chunker::new(Arc::new(WordCounter), 50, 0.1).unwrap();
        let indexer = Indexer::new(
            Arc::new(FakeFetcher::new()),
            Arc::new(FakeEmbedder::new(4)),
            store.clone(),
            chunker,
            temp.path(),
        );

        let outcome = indexer.ingest_file(&path, None, video("local1"), None).await.unwrap();

        assert!(matches!(outcome, IndexOutcome::Indexed { source: TranscriptSource::File, .. }));
        let channel = store.get_channel("UC1").await.unwrap().unwrap();
        assert_eq!(channel.name, UNKNOWN_CHANNEL);
        assert_eq!(
            store.get_video("local1").await.unwrap().unwrap().channel_id.as_deref(),
            Some("UC1")
        );
    }

    #[tokio::test]
    async fn test_ingest_malformed_file_fails_fast() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("bad.vtt");
        std::fs::write(&path, "WEBVTT\n\n00:00:xx --> 00:00:02.000\ntext\n").unwrap();

        let store = Arc::new(MemoryVectorStore::new());
        let indexer = indexer(FakeFetcher::new(), FakeEmbedder::new(4), store.clone(), temp.path());

        let result = indexer
            .ingest_file(&path, None, VideoInfo::new("v", "T"), None)
            .await;
        assert!(result.is_err());
        assert_eq!(store.stats().await.unwrap(), StoreStats::default());
    }
}
