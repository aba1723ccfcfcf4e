//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::open_store;
use anyhow::Result;

/// List channels, optionally with their videos.
pub async fn run_list(videos: bool, channel: Option<&str>, settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;

    let mut channels = store.list_channels().await?;
    if let Some(id) = channel {
        channels.retain(|c| c.channel_id == id);
    }

    if channels.is_empty() {
        Output::info("No channels indexed yet. Use 'channel-chat add <url>' to add one.");
        return Ok(());
    }

    Output::header(&format!("Indexed Channels ({})", channels.len()));
    println!();

    let mut total_videos = 0;
    let mut total_chunks = 0;
    for ch in &channels {
        let entries = store.list_videos(Some(&ch.channel_id)).await?;
        let chunks: usize = entries.iter().map(|v| v.chunk_count).sum();
        total_videos += entries.len();
        total_chunks += chunks;

        Output::list_item(&format!(
            "{} ({}, {} videos, {} chunks)",
            ch.name,
            ch.channel_id,
            entries.len(),
            chunks
        ));

        if videos {
            for entry in &entries {
                Output::video_info(
                    &entry.video.title,
                    &entry.video.video_id,
                    entry.chunk_count,
                    entry.video.duration,
                    entry.video.published_at.as_deref(),
                );
            }
        }
    }

    println!();
    Output::kv("Total videos", &total_videos.to_string());
    Output::kv("Total chunks", &total_chunks.to_string());

    Ok(())
}
