//! Embedding generation for semantic search.
//!
//! [`OpenAIEmbedder`] talks to the API one request at a time.
//! [`BatchingEmbedder`] wraps any embedder with batching, inter-batch pacing
//! and retry on rate limiting.

mod batch;
mod openai;
mod retry;

pub use batch::BatchingEmbedder;
pub use openai::OpenAIEmbedder;
pub use retry::{retry, RetryPolicy, Sleeper, TokioSleeper};

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}
