//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::indexer::{IndexOutcome, Indexer};
use crate::source::{ChannelInfo, VideoInfo};
use crate::subtitles::SubtitleFormat;
use anyhow::Result;
use std::path::Path;

/// Arguments of the ingest command.
pub struct IngestArgs<'a> {
    pub path: &'a Path,
    pub video_id: &'a str,
    pub title: &'a str,
    pub format: Option<&'a str>,
    pub channel_id: Option<&'a str>,
    pub channel_name: Option<&'a str>,
}

/// Index a local subtitle file.
pub async fn run_ingest(args: IngestArgs<'_>, settings: Settings) -> Result<()> {
    let format = args
        .format
        .map(|f| f.parse::<SubtitleFormat>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;

    if let Err(e) = preflight::check(Operation::Embed) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let mut video = VideoInfo::new(args.video_id, args.title);
    let channel = args.channel_id.map(|id| ChannelInfo {
        channel_id: id.to_string(),
        name: args.channel_name.unwrap_or(id).to_string(),
        url: String::new(),
    });
    video.channel_id = channel.as_ref().map(|c| c.channel_id.clone());

    let indexer = Indexer::from_settings(&settings)?;
    match indexer.ingest_file(args.path, format, video, channel).await {
        Ok(IndexOutcome::Indexed { title, chunks, .. }) => {
            Output::success(&format!("Ingested '{}' ({} chunks)", title, chunks));
        }
        Ok(IndexOutcome::Skipped { video_id, reason }) => {
            Output::warning(&format!("Nothing ingested for {}: {}", video_id, reason));
        }
        Err(e) => {
            Output::error(&format!("Failed to ingest {}: {}", args.path.display(), e));
            return Err(e.into());
        }
    }

    Ok(())
}
