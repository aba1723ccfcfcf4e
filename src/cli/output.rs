//! CLI output formatting utilities.

use crate::search::SearchResult;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const PREVIEW_CHARS: usize = 200;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a video line.
    pub fn video_info(title: &str, id: &str, chunks: usize, duration: Option<f64>, published: Option<&str>) {
        let mut details = vec![id.to_string(), format!("{} chunks", chunks)];
        if let Some(d) = duration {
            details.push(format_duration(d));
        }
        if let Some(p) = published {
            details.push(p.to_string());
        }
        println!(
            "    {} {} ({})",
            style("-").dim(),
            style(title).bold(),
            style(details.join(", ")).dim()
        );
    }

    /// Print one search hit.
    pub fn search_result(rank: usize, result: &SearchResult) {
        println!(
            "\n{} {} @ {} (score: {:.2})",
            style(format!("{}.", rank)).green(),
            style(&result.video_title).bold(),
            style(result.timestamp()).cyan(),
            result.score
        );
        if let Some(channel) = &result.channel_name {
            println!("   {}", style(channel).dim());
        }
        println!("   {}", content_preview(&result.text, PREVIEW_CHARS));
        println!("   {}", style(&result.deep_link).dim());
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

/// Format duration in seconds to a human-readable string.
fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Single-line preview, cut at a character boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    match content.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &content[..end]),
        None => content,
    }
}
