//! Query-time retrieval: embed the query, search a collection.

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::vectorstore::VectorStore;

/// Embeds queries and looks up their nearest chunks in a [`VectorStore`].
///
/// This is the only retrieval path; every caller gets the same empty-query
/// behavior.
#[derive(Clone)]
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    similarity_threshold: f32,
}

impl Retriever {
    /// Create a retriever with no similarity threshold.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { embedding_provider, vector_store, similarity_threshold: f32::NEG_INFINITY }
    }

    /// Drop results scoring below `threshold`.
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Return up to `k` chunks from `collection` nearest to `query`, nearest first.
    ///
    /// An empty or whitespace-only query returns an empty `Vec` without
    /// calling the embedding provider.
    ///
    /// # Errors
    ///
    /// Propagates [`RagError::Embedding`](crate::RagError::Embedding) from the
    /// provider and [`RagError::VectorStore`](crate::RagError::VectorStore)
    /// from the store.
    pub async fn retrieve(&self, collection: &str, query: &str, k: usize) -> Result<Vec<Chunk>> {
        if query.trim().is_empty() {
            debug!(collection, "empty query, skipping retrieval");
            return Ok(Vec::new());
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(collection, error = %e, "query embedding failed");
            e
        })?;

        let results = self.vector_store.query(collection, &vector, k).await.map_err(|e| {
            error!(collection, error = %e, "vector store query failed");
            e
        })?;

        let chunks: Vec<Chunk> = results
            .into_iter()
            .filter(|r| r.score >= self.similarity_threshold)
            .map(|r| r.record.chunk)
            .collect();

        debug!(collection, k, result_count = chunks.len(), "retrieved chunks");
        Ok(chunks)
    }
}
