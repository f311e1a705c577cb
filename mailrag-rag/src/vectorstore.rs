//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::{EmbeddedRecord, SearchResult};
use crate::error::{RagError, Result};

/// Identity of a collection: what every vector in it must agree on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub dimensions: usize,
    /// Embedding model the collection's vectors come from.
    pub model: String,
    /// Similarity metric used for search. Always `"cosine"`.
    pub metric: String,
}

impl CollectionInfo {
    pub const METRIC: &'static str = "cosine";

    pub fn new(name: impl Into<String>, dimensions: usize, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimensions,
            model: model.into(),
            metric: Self::METRIC.to_string(),
        }
    }

    /// Fail if an existing collection was created with a different model or size.
    pub(crate) fn ensure_compatible(&self, requested: &CollectionInfo, backend: &str) -> Result<()> {
        if self.dimensions != requested.dimensions || self.model != requested.model {
            return Err(RagError::store(
                backend,
                format!(
                    "collection '{}' holds {}-dimensional vectors from model '{}', \
                     refusing {}-dimensional vectors from model '{}'",
                    self.name, self.dimensions, self.model, requested.dimensions, requested.model
                ),
            ));
        }
        Ok(())
    }

    /// Fail if any record's vector does not match the collection's dimensionality.
    pub(crate) fn check_records(&self, records: &[EmbeddedRecord], backend: &str) -> Result<()> {
        if let Some(bad) = records.iter().find(|r| r.vector.len() != self.dimensions) {
            return Err(RagError::store(
                backend,
                format!(
                    "record '{}' has {} dimensions but collection '{}' expects {}",
                    bad.chunk.id,
                    bad.vector.len(),
                    self.name,
                    self.dimensions
                ),
            ));
        }
        Ok(())
    }

    /// Fail if a query vector does not match the collection's dimensionality.
    pub(crate) fn check_query(&self, vector: &[f32], backend: &str) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(RagError::store(
                backend,
                format!(
                    "query vector has {} dimensions but collection '{}' expects {}",
                    vector.len(),
                    self.name,
                    self.dimensions
                ),
            ));
        }
        Ok(())
    }
}

/// A storage backend for embedded records with similarity search.
///
/// Implementations manage named, append-only collections of
/// [`EmbeddedRecord`]s. Each collection is bound to one embedding model and
/// dimensionality for its whole life.
///
/// # Example
///
/// ```rust,ignore
/// use mailrag_rag::{CollectionInfo, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection(&CollectionInfo::new("db_emails", 768, "text-embedding-004")).await?;
/// store.add("db_emails", &records).await?;
/// let results = store.query("db_emails", &query_embedding, 4).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a collection. No-op if an identical collection already exists.
    ///
    /// Fails if the collection exists with a different model or dimensionality.
    async fn create_collection(&self, info: &CollectionInfo) -> Result<()>;

    /// Append records to a collection.
    ///
    /// Either every record is stored (and persisted, for durable backends)
    /// before this returns, or none is.
    async fn add(&self, collection: &str, records: &[EmbeddedRecord]) -> Result<()>;

    /// Return the `k` records most similar to `vector`, nearest first.
    ///
    /// Returns fewer than `k` results when the collection is smaller, and an
    /// empty `Vec` when it is empty. Fails if `vector` does not have the
    /// collection's dimensionality.
    async fn query(&self, collection: &str, vector: &[f32], k: usize)
    -> Result<Vec<SearchResult>>;

    /// Number of records stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Score every record against `vector` and keep the `k` best, nearest first.
///
/// Ties keep insertion order.
pub(crate) fn top_k<'a>(
    records: impl IntoIterator<Item = &'a EmbeddedRecord>,
    vector: &[f32],
    k: usize,
) -> Vec<SearchResult> {
    if k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<SearchResult> = records
        .into_iter()
        .map(|record| SearchResult {
            score: cosine_similarity(&record.vector, vector),
            record: record.clone(),
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}
