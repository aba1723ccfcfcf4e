//! Command-line interface.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// channel-chat - semantic search over YouTube channel transcripts
///
/// Indexes the subtitles (or transcribed audio) of a channel's videos into
/// embedded chunks and finds the moments that answer a question.
#[derive(Parser, Debug)]
#[command(name = "channel-chat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a channel and index its videos
    Add {
        /// Channel URL or @handle
        url: String,

        /// Maximum number of new videos to index (default: all)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Index a single video
    Index {
        /// YouTube URL or video ID
        video: String,

        /// Re-index even if the video is already stored
        #[arg(short, long)]
        force: bool,
    },

    /// Index a local subtitle file
    Ingest {
        /// Path to a .vtt or .srt file
        path: PathBuf,

        /// ID to store the transcript under
        #[arg(long)]
        video_id: String,

        /// Video title, prefixed to every chunk
        #[arg(long)]
        title: String,

        /// Subtitle format (vtt, srt); detected from the file when omitted
        #[arg(long)]
        format: Option<String>,

        /// Channel the video belongs to
        #[arg(long)]
        channel_id: Option<String>,

        /// Channel display name (requires --channel-id)
        #[arg(long, requires = "channel_id")]
        channel_name: Option<String>,
    },

    /// Search indexed transcripts
    Search {
        /// Search query
        query: String,

        /// Maximum number of results (default from config)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List indexed channels
    List {
        /// Also list each channel's videos
        #[arg(long)]
        videos: bool,

        /// Only show this channel
        #[arg(long)]
        channel: Option<String>,
    },

    /// Remove a video and its chunks
    Remove {
        /// Video ID
        video_id: String,
    },

    /// Show index statistics
    Stats,

    /// Start MCP server for AI assistant integration
    Mcp,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
