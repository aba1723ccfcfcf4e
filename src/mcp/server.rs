//! MCP server implementation.

use super::protocol::*;
use super::tools::get_tools;
use crate::config::Settings;
use crate::indexer::{IndexOutcome, Indexer};
use crate::search::format_timestamp;
use crate::source::extract_video_id;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "channel-chat";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_SEARCH_LIMIT: usize = 5;
const EXCERPT_CHARS: usize = 300;

/// MCP server exposing search and indexing as tools.
pub struct McpServer {
    settings: Settings,
    indexer: Option<Indexer>,
}

impl McpServer {
    /// Create a server whose pipeline is built on `initialize`.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            indexer: None,
        }
    }

    /// Create a server around an existing pipeline.
    pub fn with_indexer(settings: Settings, indexer: Indexer) -> Self {
        Self {
            settings,
            indexer: Some(indexer),
        }
    }

    /// Run the server on stdin/stdout.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        info!("MCP server starting");
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Answer newline-delimited JSON-RPC messages until `reader` is exhausted.
    pub async fn serve<R, W>(&mut self, reader: R, mut writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(line).await {
                let mut encoded = serde_json::to_string(&response)?;
                encoded.push('\n');
                writer.write_all(encoded.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        info!("MCP input closed, shutting down");
        Ok(())
    }

    /// Handle one raw message. Notifications get no response.
    pub async fn handle_message(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                warn!("Failed to parse request: {}", e);
                return Some(JsonRpcResponse::error(None, PARSE_ERROR, "Parse error"));
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            ));
        }

        if request.is_notification() {
            debug!("Notification {}", request.method);
            return None;
        }

        Some(self.handle_request(request).await)
    }

    async fn handle_request(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => {
                JsonRpcResponse::from_result(request.id, &ToolsListResult { tools: get_tools() })
            }
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            _ => JsonRpcResponse::error(
                request.id,
                METHOD_NOT_FOUND,
                &format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&mut self, id: Option<Value>) -> JsonRpcResponse {
        if self.indexer.is_none() {
            match Indexer::from_settings(&self.settings) {
                Ok(indexer) => {
                    self.indexer = Some(indexer);
                    info!("Indexing pipeline initialized");
                }
                Err(e) => {
                    warn!("Failed to initialize pipeline: {}", e);
                    return JsonRpcResponse::error(id, SERVER_ERROR, &format!("Init failed: {}", e));
                }
            }
        }

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
        };

        JsonRpcResponse::from_result(id, &result)
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(id, INVALID_PARAMS, &format!("Invalid params: {}", e))
                }
            },
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        let Some(indexer) = &self.indexer else {
            return JsonRpcResponse::from_result(
                id,
                &ToolCallResult::error("Server not initialized".to_string()),
            );
        };

        let args = params.arguments.unwrap_or_else(|| json!({}));
        let result = match params.name.as_str() {
            "search_transcripts" => tool_search(indexer, &args).await,
            "list_indexed_channels" => tool_list_channels(indexer).await,
            "add_channel" => tool_add_channel(indexer, &args).await,
            "index_video" => tool_index_video(indexer, &args).await,
            "get_stats" => tool_stats(indexer).await,
            other => ToolCallResult::error(format!("Unknown tool: {}", other)),
        };

        JsonRpcResponse::from_result(id, &result)
    }
}

async fn tool_search(indexer: &Indexer, args: &Value) -> ToolCallResult {
    let Some(query) = args.get("query").and_then(|v| v.as_str()) else {
        return ToolCallResult::error("Missing 'query' argument".to_string());
    };
    let limit = args
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|l| l as usize)
        .unwrap_or(DEFAULT_SEARCH_LIMIT);

    let results = match indexer.searcher().search(query, limit).await {
        Ok(results) => results,
        Err(e) => return ToolCallResult::error(format!("Search failed: {}", e)),
    };

    if results.is_empty() {
        return ToolCallResult::text("No results found.".to_string());
    }

    let mut output = format!("Found {} results for: {}\n\n", results.len(), query);
    for (i, r) in results.iter().enumerate() {
        output.push_str(&format!("**Result {}** (Score: {:.1}%)\n", i + 1, r.score * 100.0));
        output.push_str(&format!("- Video: {}\n", r.video_title));
        output.push_str(&format!(
            "- Channel: {}\n",
            r.channel_name.as_deref().unwrap_or("Unknown")
        ));
        output.push_str(&format!("- Timestamp: {}\n", format_timestamp(r.start_time)));
        output.push_str(&format!("- Link: {}\n", r.deep_link));
        output.push_str(&format!("- Excerpt: {}\n\n", excerpt(&r.text, EXCERPT_CHARS)));
    }

    ToolCallResult::text(output)
}

async fn tool_list_channels(indexer: &Indexer) -> ToolCallResult {
    let store = indexer.store();
    let channels = match store.list_channels().await {
        Ok(channels) => channels,
        Err(e) => return ToolCallResult::error(format!("Failed to list channels: {}", e)),
    };

    if channels.is_empty() {
        return ToolCallResult::text("No channels indexed yet.".to_string());
    }

    let mut output = "**Indexed Channels:**\n\n".to_string();
    for channel in &channels {
        let videos = match store.list_videos(Some(&channel.channel_id)).await {
            Ok(videos) => videos.len(),
            Err(e) => return ToolCallResult::error(format!("Failed to list videos: {}", e)),
        };
        output.push_str(&format!("- **{}** ({} videos)\n", channel.name, videos));
        output.push_str(&format!("  ID: {}\n", channel.channel_id));
    }

    ToolCallResult::text(output)
}

async fn tool_add_channel(indexer: &Indexer, args: &Value) -> ToolCallResult {
    let Some(url) = args.get("url").and_then(|v| v.as_str()) else {
        return ToolCallResult::error("Missing 'url' argument".to_string());
    };
    let limit = args
        .get("max_videos")
        .and_then(|v| v.as_u64())
        .map(|l| l as usize);

    let report = match indexer.add_channel(url, limit).await {
        Ok(report) => report,
        Err(e) => return ToolCallResult::error(format!("Error: {}", e)),
    };

    if report.indexed + report.skipped + report.failed == 0 {
        return ToolCallResult::text(format!(
            "Channel '{}' - all videos already indexed.",
            report.channel.name
        ));
    }

    let mut output = format!("**Indexed channel: {}**\n", report.channel.name);
    output.push_str(&format!("- Successfully indexed: {} videos\n", report.indexed));
    output.push_str(&format!("- No transcript: {} videos\n", report.skipped));
    output.push_str(&format!("- Failed: {} videos\n", report.failed));
    output.push_str(&format!(
        "- Skipped (already indexed): {} videos\n",
        report.already_indexed
    ));

    ToolCallResult::text(output)
}

async fn tool_index_video(indexer: &Indexer, args: &Value) -> ToolCallResult {
    let Some(input) = args.get("video_id").and_then(|v| v.as_str()) else {
        return ToolCallResult::error("Missing 'video_id' argument".to_string());
    };
    let Some(video_id) = extract_video_id(input) else {
        return ToolCallResult::error(format!("Not a YouTube video ID or URL: {}", input));
    };

    match indexer.index_video(&video_id, None).await {
        Ok(IndexOutcome::Indexed { title, chunks, .. }) => {
            ToolCallResult::text(format!("Indexed {} ({} chunks)", title, chunks))
        }
        Ok(IndexOutcome::Skipped { video_id, reason }) => {
            ToolCallResult::text(format!("Skipped {}: {}", video_id, reason))
        }
        Err(e) => ToolCallResult::error(format!("Error: {}", e)),
    }
}

async fn tool_stats(indexer: &Indexer) -> ToolCallResult {
    match indexer.store().stats().await {
        Ok(stats) => ToolCallResult::text(format!(
            "**Channel Chat Stats:**\n- Channels indexed: {}\n- Videos indexed: {}\n- Transcript chunks: {}\n",
            stats.channels, stats.videos, stats.chunks
        )),
        Err(e) => ToolCallResult::error(format!("Failed to get stats: {}", e)),
    }
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
