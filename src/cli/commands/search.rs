//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::indexer::Indexer;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, limit: Option<usize>, json: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Embed) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let limit = limit.unwrap_or(settings.search.default_limit);
    let searcher = Indexer::from_settings(&settings)?.searcher();

    let spinner = Output::spinner("Searching...");
    let results = searcher.search(query, limit).await;
    spinner.finish_and_clear();

    let results = match results {
        Ok(results) => results,
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        Output::warning("No results found matching your query.");
        return Ok(());
    }

    Output::success(&format!("Found {} results", results.len()));
    for (i, result) in results.iter().enumerate() {
        Output::search_result(i + 1, result);
    }

    Ok(())
}
