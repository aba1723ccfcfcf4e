//! channel-chat - semantic search over YouTube channel transcripts
//!
//! Downloads subtitles (or transcribes audio) for a channel's videos, packs the
//! timed segments into overlapping token-bounded chunks, embeds them and ranks
//! them against natural-language queries with links to the exact moment.
//!
//! # Architecture
//!
//! - `subtitles` - WebVTT and SRT parsing into timed segments
//! - `transcription` - segment model, normalization and speech-to-text
//! - `chunking` - token-budgeted chunk packing with overlap
//! - `embedding` - embedding clients with batching and retry
//! - `vector_store` - channels, videos and embedded chunks
//! - `search` - query embedding, ranking and result assembly
//! - `source` - channel and video fetching via yt-dlp
//! - `indexer` - pipeline coordination
//! - `mcp` - MCP server exposing search and indexing as tools
//!
//! # Example
//!
//! ```rust,no_run
//! use channel_chat::config::Settings;
//! use channel_chat::indexer::Indexer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let indexer = Indexer::from_settings(&settings)?;
//!
//!     indexer.add_channel("@rustlang", Some(5)).await?;
//!     for hit in indexer.searcher().search("async traits", 3).await? {
//!         println!("{} {}", hit.video_title, hit.deep_link);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod mcp;
pub mod openai;
pub mod search;
pub mod source;
pub mod subtitles;
pub mod transcription;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ChannelChatError, Result};
