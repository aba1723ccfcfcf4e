//! Remove command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::open_store;
use anyhow::Result;

/// Delete a video and its chunks.
pub async fn run_remove(video_id: &str, settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;

    if store.remove_video(video_id).await? {
        Output::success(&format!("Removed {}", video_id));
    } else {
        Output::warning(&format!("{} is not indexed", video_id));
    }

    Ok(())
}
