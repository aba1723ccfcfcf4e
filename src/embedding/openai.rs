//! OpenAI embeddings implementation.

use super::Embedder;
use crate::error::{is_rate_limit_message, ChannelChatError, Result};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI-based embedder. Each call is a single API request; batching and
/// retries belong to [`super::BatchingEmbedder`].
pub struct OpenAIEmbedder {
    client: async_openai::Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create an embedder with the default model and 768 dimensions.
    pub fn new() -> Result<Self> {
        Self::with_config("text-embedding-3-small", 768)
    }

    /// Create an embedder with a custom model and output dimensions.
    pub fn with_config(model: &str, dimensions: usize) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            dimensions,
        })
    }
}

/// Classify an API error as rate limiting or a plain embedding failure.
fn map_api_error(err: OpenAIError) -> ChannelChatError {
    let message = err.to_string();
    let rate_limited = match &err {
        OpenAIError::ApiError(api) => {
            is_rate_limit_message(&format!("{:?} {:?} {}", api.code, api.r#type, api.message))
        }
        OpenAIError::Reqwest(e) => e.status().is_some_and(|s| s.as_u16() == 429),
        _ => false,
    } || is_rate_limit_message(&message);

    if rate_limited {
        ChannelChatError::RateLimited(message)
    } else {
        ChannelChatError::Embedding(message)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ChannelChatError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Requesting embeddings for {} texts", texts.len());

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(texts.to_vec()))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| ChannelChatError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(map_api_error)?;

        // Sort by index to ensure input order
        let mut data = response.data;
        data.sort_by_key(|e| e.index);

        Ok(data.into_iter().map(|e| e.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::error::ApiError;

    fn api_error(message: &str, code: Option<&str>) -> OpenAIError {
        let api: ApiError = serde_json::from_value(serde_json::json!({
            "message": message,
            "type": null,
            "param": null,
            "code": code,
        }))
        .unwrap();
        OpenAIError::ApiError(api)
    }

    #[test]
    fn test_embedder_creation() {
        let embedder = OpenAIEmbedder::new().unwrap();
        assert_eq!(embedder.dimensions(), 768);

        let embedder = OpenAIEmbedder::with_config("text-embedding-3-large", 3072).unwrap();
        assert_eq!(embedder.dimensions(), 3072);
    }

    #[test]
    fn test_maps_rate_limit_errors() {
        let err = map_api_error(api_error("Too many requests", Some("rate_limit_exceeded")));
        assert!(matches!(err, ChannelChatError::RateLimited(_)));

        let err = map_api_error(api_error("You exceeded your current quota", None));
        assert!(matches!(err, ChannelChatError::RateLimited(_)));

        let err = map_api_error(api_error("Invalid API key", Some("invalid_api_key")));
        assert!(matches!(err, ChannelChatError::Embedding(_)));
        assert!(!err.is_rate_limited());
    }
}
