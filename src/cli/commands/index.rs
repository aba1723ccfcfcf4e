//! Index command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::indexer::{IndexOutcome, Indexer};
use crate::source::extract_video_id;
use anyhow::Result;

/// Index one video by URL or ID.
pub async fn run_index(input: &str, force: bool, settings: Settings) -> Result<()> {
    let video_id = extract_video_id(input)
        .ok_or_else(|| anyhow::anyhow!("Not a YouTube video ID or URL: {}", input))?;

    if let Err(e) = preflight::check(Operation::Index) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let indexer = Indexer::from_settings(&settings)?;

    if !force && indexer.store().video_exists(&video_id).await? {
        Output::warning(&format!(
            "{} is already indexed. Use --force to re-index.",
            video_id
        ));
        return Ok(());
    }

    let spinner = Output::spinner(&format!("Indexing {}...", video_id));
    let result = indexer.index_video(&video_id, None).await;
    spinner.finish_and_clear();

    match result {
        Ok(IndexOutcome::Indexed { title, chunks, source, .. }) => {
            Output::success(&format!("Indexed '{}' ({} chunks from {})", title, chunks, source));
        }
        Ok(IndexOutcome::Skipped { video_id, reason }) => {
            Output::warning(&format!("Skipped {}: {}", video_id, reason));
        }
        Err(e) => {
            Output::error(&format!("Failed to index {}: {}", video_id, e));
            return Err(e.into());
        }
    }

    Ok(())
}
