//! channel-chat CLI entry point.

use anyhow::Result;
use channel_chat::cli::commands::{self, IngestArgs};
use channel_chat::cli::{Cli, Commands};
use channel_chat::config::Settings;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // stdout carries command output and MCP traffic, so logs go to stderr.
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("channel_chat={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let settings = Settings::load_from(cli.config.as_ref())?;

    std::fs::create_dir_all(settings.data_dir())?;

    match &cli.command {
        Commands::Add { url, limit } => {
            commands::run_add(url, *limit, settings).await?;
        }

        Commands::Index { video, force } => {
            commands::run_index(video, *force, settings).await?;
        }

        Commands::Ingest {
            path,
            video_id,
            title,
            format,
            channel_id,
            channel_name,
        } => {
            let args = IngestArgs {
                path,
                video_id,
                title,
                format: format.as_deref(),
                channel_id: channel_id.as_deref(),
                channel_name: channel_name.as_deref(),
            };
            commands::run_ingest(args, settings).await?;
        }

        Commands::Search { query, limit, json } => {
            commands::run_search(query, *limit, *json, settings).await?;
        }

        Commands::List { videos, channel } => {
            commands::run_list(*videos, channel.as_deref(), settings).await?;
        }

        Commands::Remove { video_id } => {
            commands::run_remove(video_id, settings).await?;
        }

        Commands::Stats => {
            commands::run_stats(settings).await?;
        }

        Commands::Mcp => {
            commands::run_mcp(settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, cli.config.clone(), settings)?;
        }
    }

    Ok(())
}
