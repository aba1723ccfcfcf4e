//! MCP tool definitions.

use super::protocol::Tool;
use serde_json::json;

/// Get all available tools.
pub fn get_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: "search_transcripts".to_string(),
            description: "Search across all indexed YouTube video transcripts using semantic search. \
                Returns relevant clips with timestamps and YouTube links."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query - can be a question or topic"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default: 5)",
                        "default": 5
                    }
                },
                "required": ["query"]
            }),
        },
        Tool {
            name: "list_indexed_channels".to_string(),
            description: "List all YouTube channels that have been indexed for searching.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        Tool {
            name: "add_channel".to_string(),
            description: "Add a YouTube channel and index all its videos for searching. \
                This may take a while for large channels."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "YouTube channel URL (e.g., https://youtube.com/@channelname)"
                    },
                    "max_videos": {
                        "type": "integer",
                        "description": "Maximum number of videos to index (default: all)"
                    }
                },
                "required": ["url"]
            }),
        },
        Tool {
            name: "index_video".to_string(),
            description: "Index a specific YouTube video for searching.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "video_id": {
                        "type": "string",
                        "description": "YouTube video ID or URL (e.g., dQw4w9WgXcQ)"
                    }
                },
                "required": ["video_id"]
            }),
        },
        Tool {
            name: "get_stats".to_string(),
            description: "Get statistics about indexed content.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}
