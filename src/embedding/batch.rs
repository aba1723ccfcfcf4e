//! Batched, paced and retried embedding.

use super::{retry, Embedder, RetryPolicy, Sleeper, TokioSleeper};
use crate::config::EmbeddingSettings;
use crate::error::{ChannelChatError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Wraps an embedder with batching, a fixed delay between batches, and
/// retry on rate limiting.
///
/// A failure in any batch fails the whole call; vectors from earlier batches
/// are discarded.
pub struct BatchingEmbedder<E> {
    inner: E,
    batch_size: usize,
    batch_delay: Duration,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl<E: Embedder> BatchingEmbedder<E> {
    pub fn new(inner: E, batch_size: usize, batch_delay: Duration, policy: RetryPolicy) -> Self {
        Self {
            inner,
            batch_size: batch_size.max(1),
            batch_delay,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Wrap `inner` using the batching and retry values from the settings.
    pub fn from_settings(inner: E, settings: &EmbeddingSettings) -> Self {
        Self::new(
            inner,
            settings.batch_size,
            settings.batch_delay(),
            settings.retry_policy(),
        )
    }

    /// Replace the sleeper used for backoff and pacing.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }
}

#[async_trait]
impl<E: Embedder> Embedder for BatchingEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        retry(&self.policy, self.sleeper.as_ref(), || self.inner.embed(text)).await
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        let batch_count = texts.len().div_ceil(self.batch_size);

        for (i, batch) in texts.chunks(self.batch_size).enumerate() {
            if i > 0 {
                self.sleeper.sleep(self.batch_delay).await;
            }

            debug!("Embedding batch {}/{} ({} texts)", i + 1, batch_count, batch.len());

            let vectors =
                retry(&self.policy, self.sleeper.as_ref(), || self.inner.embed_batch(batch)).await?;

            if vectors.len() != batch.len() {
                return Err(ChannelChatError::Embedding(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            embeddings.extend(vectors);
        }

        if batch_count > 0 {
            info!("Generated {} embeddings in {} batches", embeddings.len(), batch_count);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}
