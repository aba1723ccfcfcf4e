//! Query-time search over the vector store.

use super::{assemble, SearchResult};
use crate::embedding::Embedder;
use crate::error::{ChannelChatError, Result};
use crate::vector_store::VectorStore;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Embeds a query and ranks stored chunks against it.
pub struct Searcher {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl Searcher {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Return up to `limit` results, best first.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ChannelChatError::InvalidInput("Search query is empty".to_string()));
        }

        let vector = self.embedder.embed(query).await?;
        let matches = self.store.nearest(&vector, limit).await?;
        debug!("Store returned {} matches", matches.len());

        Ok(assemble(matches, limit))
    }
}
