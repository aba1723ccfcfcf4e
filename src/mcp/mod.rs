//! MCP (Model Context Protocol) server.
//!
//! Lets AI assistants search indexed transcripts and index new content as
//! tools. Implements JSON-RPC 2.0 over stdio.

mod protocol;
mod server;
mod tools;

pub use server::McpServer;
