//! `yt-dlp` backed content fetcher.

use super::{channel_videos_url, watch_url, ChannelInfo, ContentFetcher, VideoInfo};
use crate::error::{ChannelChatError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, info, instrument};

const SUBTITLE_LANGS: [&str; 3] = ["en", "en-US", "en-GB"];
const SUBTITLE_EXTS: [&str; 2] = ["vtt", "srt"];
const AUDIO_EXTS: [&str; 4] = ["mp3", "m4a", "opus", "webm"];

/// Fetches metadata and media by running the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    program: String,
}

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self::with_program("yt-dlp")
    }

    /// Use a different executable name or path.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        debug!("Running {} {}", self.program, args.join(" "));

        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ChannelChatError::ToolNotFound(self.program.clone())
                } else {
                    ChannelChatError::Fetch(format!("Failed to run {}: {}", self.program, e))
                }
            })
    }

    async fn write_subtitles(&self, video_id: &str, dir: &Path, automatic: bool) -> Result<Option<PathBuf>> {
        let template = dir.join(format!("{}.%(ext)s", video_id));
        let template = template.to_string_lossy();
        let url = watch_url(video_id);
        let langs = SUBTITLE_LANGS.join(",");

        let output = self
            .run(&[
                if automatic { "--write-auto-subs" } else { "--write-subs" },
                "--skip-download",
                "--sub-langs",
                &langs,
                "--sub-format",
                "vtt/srt/best",
                "--no-warnings",
                "--output",
                &template,
                &url,
            ])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChannelChatError::Fetch(format!(
                "Failed to download subtitles for {}: {}",
                video_id,
                stderr.trim()
            )));
        }

        Ok(find_subtitle_file(dir, video_id))
    }
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentFetcher for YtDlpFetcher {
    #[instrument(skip(self))]
    async fn channel_info(&self, url: &str) -> Result<ChannelInfo> {
        let output = self
            .run(&[
                "--dump-single-json",
                "--flat-playlist",
                "--playlist-end",
                "1",
                "--no-warnings",
                url,
            ])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChannelChatError::ChannelNotFound(format!("{}: {}", url, stderr.trim())));
        }

        let json: Value = serde_json::from_slice(&output.stdout)?;
        parse_channel_info(&json, url)
    }

    #[instrument(skip(self))]
    async fn channel_videos(&self, url: &str) -> Result<Vec<String>> {
        let videos_url = channel_videos_url(url);
        let output = self
            .run(&[
                "--flat-playlist",
                "--print",
                "id",
                "--ignore-errors",
                "--no-warnings",
                &videos_url,
            ])
            .await?;

        let ids = parse_id_lines(&String::from_utf8_lossy(&output.stdout));

        // --ignore-errors keeps going past broken entries, so only an empty
        // listing from a failed run means the channel itself is unavailable.
        if ids.is_empty() && !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChannelChatError::ChannelNotFound(format!(
                "{}: {}",
                videos_url,
                stderr.trim()
            )));
        }

        info!("Found {} videos", ids.len());
        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn video_info(&self, video_id: &str) -> Result<VideoInfo> {
        let url = watch_url(video_id);
        let output = self
            .run(&["--dump-json", "--no-download", "--no-warnings", &url])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChannelChatError::VideoNotFound(format!(
                "{} not found or unavailable: {}",
                video_id,
                stderr.trim()
            )));
        }

        let json: Value = serde_json::from_slice(&output.stdout)?;
        Ok(parse_video_info(&json, video_id))
    }

    #[instrument(skip(self, dir))]
    async fn download_subtitles(&self, video_id: &str, dir: &Path) -> Result<Option<PathBuf>> {
        tokio::fs::create_dir_all(dir).await?;

        if let Some(path) = self.write_subtitles(video_id, dir, false).await? {
            debug!("Using manual subtitles");
            return Ok(Some(path));
        }

        let automatic = self.write_subtitles(video_id, dir, true).await?;
        if automatic.is_some() {
            debug!("Using automatic captions");
        }
        Ok(automatic)
    }

    #[instrument(skip(self, dir))]
    async fn download_audio(&self, video_id: &str, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;

        let template = dir.join(format!("{}.%(ext)s", video_id));
        let template = template.to_string_lossy();
        let url = watch_url(video_id);

        info!("Downloading audio");

        let output = self
            .run(&[
                "--format",
                "bestaudio[ext=m4a]/bestaudio[ext=mp3]/bestaudio/best",
                "--extract-audio",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "192K",
                "--no-playlist",
                "--no-warnings",
                "--output",
                &template,
                &url,
            ])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChannelChatError::Fetch(format!(
                "Failed to download audio for {}: {}",
                video_id,
                stderr.trim()
            )));
        }

        find_audio_file(dir, video_id).ok_or_else(|| {
            ChannelChatError::Fetch(format!("Audio file not found after download for {}", video_id))
        })
    }
}

fn json_str<'a>(json: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| json[*k].as_str())
        .find(|s| !s.is_empty())
}

fn parse_channel_info(json: &Value, url: &str) -> Result<ChannelInfo> {
    let channel_id = json_str(json, &["channel_id", "uploader_id"])
        .ok_or_else(|| ChannelChatError::ChannelNotFound(format!("No channel ID for {}", url)))?;

    let name = json_str(json, &["channel", "uploader", "title"]).unwrap_or(channel_id);
    let channel_url = json_str(json, &["channel_url", "uploader_url"]).unwrap_or(url);

    Ok(ChannelInfo {
        channel_id: channel_id.to_string(),
        name: name.to_string(),
        url: channel_url.to_string(),
    })
}

fn parse_video_info(json: &Value, video_id: &str) -> VideoInfo {
    // yt-dlp reports the upload date as YYYYMMDD
    let published_at = json["upload_date"].as_str().map(|raw| {
        chrono::NaiveDate::parse_from_str(raw, "%Y%m%d")
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|_| raw.to_string())
    });

    let thumbnail_url = json["thumbnails"]
        .as_array()
        .and_then(|thumbs| thumbs.iter().rev().find_map(|t| t["url"].as_str()))
        .or_else(|| json["thumbnail"].as_str())
        .map(str::to_string);

    VideoInfo {
        id: json_str(json, &["id"]).unwrap_or(video_id).to_string(),
        title: json_str(json, &["title"]).unwrap_or("Untitled").to_string(),
        description: json_str(json, &["description"]).map(str::to_string),
        duration: json["duration"].as_f64(),
        published_at,
        thumbnail_url,
        channel_id: json_str(json, &["channel_id"]).map(str::to_string),
    }
}

fn parse_id_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("NA"))
        .map(str::to_string)
        .collect()
}

/// Locate a downloaded subtitle file, preferring VTT and then language order.
fn find_subtitle_file(dir: &Path, video_id: &str) -> Option<PathBuf> {
    let with_lang = SUBTITLE_EXTS.iter().flat_map(|ext| {
        SUBTITLE_LANGS
            .iter()
            .map(move |lang| dir.join(format!("{}.{}.{}", video_id, lang, ext)))
    });
    let without_lang = SUBTITLE_EXTS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", video_id, ext)));

    with_lang.chain(without_lang).find(|p| p.exists())
}

/// Locate a downloaded audio file by video ID.
fn find_audio_file(dir: &Path, video_id: &str) -> Option<PathBuf> {
    AUDIO_EXTS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", video_id, ext)))
        .find(|p| p.exists())
}
