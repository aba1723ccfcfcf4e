//! CLI command implementations.

mod add;
mod config;
mod index;
mod ingest;
mod list;
mod mcp;
mod remove;
mod search;
mod stats;

pub use add::run_add;
pub use config::run_config;
pub use index::run_index;
pub use ingest::{run_ingest, IngestArgs};
pub use list::run_list;
pub use mcp::run_mcp;
pub use remove::run_remove;
pub use search::run_search;
pub use stats::run_stats;
