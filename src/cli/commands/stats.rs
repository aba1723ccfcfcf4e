//! Stats command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::open_store;
use anyhow::Result;

pub async fn run_stats(settings: Settings) -> Result<()> {
    let stats = open_store(&settings)?.stats().await?;

    Output::header("Channel Chat Stats");
    Output::kv("Channels", &stats.channels.to_string());
    Output::kv("Videos", &stats.videos.to_string());
    Output::kv("Chunks", &stats.chunks.to_string());
    Output::kv("Database", &settings.sqlite_path().display().to_string());

    Ok(())
}
