//! Add command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::indexer::Indexer;
use anyhow::Result;

/// Index the not-yet-stored videos of a channel.
pub async fn run_add(url: &str, limit: Option<usize>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let indexer = Indexer::from_settings(&settings)?;

    let spinner = Output::spinner(&format!("Indexing {}...", url));
    let result = indexer.add_channel(url, limit).await;
    spinner.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            Output::error(&format!("Failed to add channel: {}", e));
            return Err(e.into());
        }
    };

    Output::success(&format!("Channel: {}", report.channel.name));
    Output::kv("Videos found", &report.found.to_string());
    Output::kv("Already indexed", &report.already_indexed.to_string());
    Output::kv("Indexed", &report.indexed.to_string());
    Output::kv("No transcript", &report.skipped.to_string());
    Output::kv("Failed", &report.failed.to_string());

    if report.failed > 0 {
        Output::warning("Some videos failed; run with -v to see why.");
    }

    Ok(())
}
