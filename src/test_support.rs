//! Fakes shared by unit tests.

use crate::embedding::{Embedder, Sleeper};
use crate::error::{ChannelChatError, Result};
use crate::source::{ChannelInfo, ContentFetcher, VideoInfo};
use crate::transcription::{Segment, Transcriber};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records requested delays instead of sleeping.
#[derive(Default)]
pub(crate) struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Deterministic embedder with a scripted sequence of failures.
///
/// Each call consumes one script entry: `Some(err)` fails the call, `None`
/// lets it succeed. Calls past the end of the script succeed.
pub(crate) struct FakeEmbedder {
    dims: usize,
    calls: Arc<Mutex<Vec<usize>>>,
    script: Mutex<VecDeque<Option<ChannelChatError>>>,
    overrides: HashMap<String, Vec<f32>>,
    drop_last: bool,
}

impl FakeEmbedder {
    pub(crate) fn new(dims: usize) -> Self {
        Self {
            dims,
            calls: Arc::new(Mutex::new(Vec::new())),
            script: Mutex::new(VecDeque::new()),
            overrides: HashMap::new(),
            drop_last: false,
        }
    }

    /// Batch sizes of every call made so far.
    pub(crate) fn calls(&self) -> Arc<Mutex<Vec<usize>>> {
        self.calls.clone()
    }

    pub(crate) fn fail_with(self, err: ChannelChatError) -> Self {
        self.script.lock().unwrap().push_back(Some(err));
        self
    }

    pub(crate) fn succeed_then_fail(self, successes: usize, err: ChannelChatError) -> Self {
        {
            let mut script = self.script.lock().unwrap();
            script.extend((0..successes).map(|_| None));
            script.push_back(Some(err));
        }
        self
    }

    /// Return one vector fewer than requested.
    pub(crate) fn drop_last(mut self) -> Self {
        self.drop_last = true;
        self
    }

    /// Use a fixed vector for `text`.
    pub(crate) fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.overrides.insert(text.to_string(), vector);
        self
    }

    /// The vector produced for `text` when no override is set.
    pub(crate) fn vector_for(text: &str, dims: usize) -> Vec<f32> {
        let hash = text
            .bytes()
            .fold(17u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        (0..dims)
            .map(|i| (hash.wrapping_add(i as u32 * 7919) % 97) as f32 + 1.0)
            .collect()
    }

    fn next_outcome(&self, batch_size: usize) -> Result<()> {
        self.calls.lock().unwrap().push(batch_size);
        match self.script.lock().unwrap().pop_front() {
            Some(Some(err)) => Err(err),
            _ => Ok(()),
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        self.overrides
            .get(text)
            .cloned()
            .unwrap_or_else(|| Self::vector_for(text, self.dims))
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.next_outcome(1)?;
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.next_outcome(texts.len())?;
        let mut vectors: Vec<_> = texts.iter().map(|t| self.vector(t)).collect();
        if self.drop_last {
            vectors.pop();
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// In-memory stand-in for the video platform.
///
/// Subtitles are written to the download directory as WebVTT, audio as an
/// empty `.mp3` file.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    channels: HashMap<String, ChannelInfo>,
    uploads: HashMap<String, Vec<String>>,
    videos: HashMap<String, VideoInfo>,
    subtitles: HashMap<String, String>,
    audio: Vec<String>,
    downloads: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_channel(mut self, url: &str, info: ChannelInfo, video_ids: &[&str]) -> Self {
        self.uploads.insert(
            url.to_string(),
            video_ids.iter().map(|id| id.to_string()).collect(),
        );
        self.channels.insert(url.to_string(), info);
        self
    }

    pub(crate) fn with_video(mut self, info: VideoInfo) -> Self {
        self.videos.insert(info.id.clone(), info);
        self
    }

    pub(crate) fn with_subtitles(mut self, video_id: &str, vtt: &str) -> Self {
        self.subtitles.insert(video_id.to_string(), vtt.to_string());
        self
    }

    pub(crate) fn with_audio(mut self, video_id: &str) -> Self {
        self.audio.push(video_id.to_string());
        self
    }

    /// `"subs:<id>"` and `"audio:<id>"` entries in call order.
    pub(crate) fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentFetcher for FakeFetcher {
    async fn channel_info(&self, url: &str) -> Result<ChannelInfo> {
        self.channels
            .get(url)
            .cloned()
            .ok_or_else(|| ChannelChatError::ChannelNotFound(url.to_string()))
    }

    async fn channel_videos(&self, url: &str) -> Result<Vec<String>> {
        self.uploads
            .get(url)
            .cloned()
            .ok_or_else(|| ChannelChatError::ChannelNotFound(url.to_string()))
    }

    async fn video_info(&self, video_id: &str) -> Result<VideoInfo> {
        self.videos
            .get(video_id)
            .cloned()
            .ok_or_else(|| ChannelChatError::VideoNotFound(video_id.to_string()))
    }

    async fn download_subtitles(&self, video_id: &str, dir: &Path) -> Result<Option<PathBuf>> {
        self.downloads.lock().unwrap().push(format!("subs:{}", video_id));
        match self.subtitles.get(video_id) {
            Some(vtt) => {
                let path = dir.join(format!("{}.en.vtt", video_id));
                std::fs::write(&path, vtt)?;
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }

    async fn download_audio(&self, video_id: &str, dir: &Path) -> Result<PathBuf> {
        self.downloads.lock().unwrap().push(format!("audio:{}", video_id));
        if !self.audio.iter().any(|id| id == video_id) {
            return Err(ChannelChatError::Fetch(format!("no audio for {}", video_id)));
        }
        let path = dir.join(format!("{}.mp3", video_id));
        std::fs::write(&path, b"")?;
        Ok(path)
    }
}

/// Returns fixed segments for any existing audio file.
pub(crate) struct FakeTranscriber {
    segments: Vec<Segment>,
}

impl FakeTranscriber {
    pub(crate) fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<Segment>> {
        if !audio_path.exists() {
            return Err(ChannelChatError::Transcription(format!(
                "missing audio {}",
                audio_path.display()
            )));
        }
        Ok(self.segments.clone())
    }
}
