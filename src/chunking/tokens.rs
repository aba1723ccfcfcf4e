//! Token counting oracles.

use crate::error::{ChannelChatError, Result};
use tiktoken_rs::{cl100k_base, o200k_base, CoreBPE};

/// Counts tokens in a piece of text.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// BPE token counter backed by `tiktoken-rs`.
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    /// Load a named encoding (`cl100k_base` or `o200k_base`).
    pub fn new(encoding: &str) -> Result<Self> {
        let bpe = match encoding {
            "cl100k_base" => cl100k_base(),
            "o200k_base" => o200k_base(),
            other => {
                return Err(ChannelChatError::Config(format!(
                    "Unsupported token encoding: {}. Use cl100k_base or o200k_base.",
                    other
                )))
            }
        }
        .map_err(|e| ChannelChatError::Config(format!("Failed to load {}: {}", encoding, e)))?;

        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Counts whitespace-separated words. Handy where exact BPE counts do not matter.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordCounter;

impl TokenCounter for WordCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}
