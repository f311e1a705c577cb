//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It is suitable for
//! development and testing; nothing survives the process.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{EmbeddedRecord, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{CollectionInfo, VectorStore, top_k};

const BACKEND: &str = "InMemory";

#[derive(Debug)]
struct Collection {
    info: CollectionInfo,
    records: Vec<EmbeddedRecord>,
}

/// An in-memory vector store using cosine similarity for search.
///
/// Collections are stored as a map from collection name to its records in
/// insertion order. All operations are async-safe via `tokio::sync::RwLock`.
///
/// # Example
///
/// ```rust,ignore
/// use mailrag_rag::{CollectionInfo, InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection(&CollectionInfo::new("db", 768, "text-embedding-004")).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(collection: &str) -> RagError {
    RagError::store(BACKEND, format!("collection '{collection}' does not exist"))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, info: &CollectionInfo) -> Result<()> {
        let mut collections = self.collections.write().await;
        match collections.get(&info.name) {
            Some(existing) => existing.info.ensure_compatible(info, BACKEND),
            None => {
                collections.insert(
                    info.name.clone(),
                    Collection { info: info.clone(), records: Vec::new() },
                );
                Ok(())
            }
        }
    }

    async fn add(&self, collection: &str, records: &[EmbeddedRecord]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        store.info.check_records(records, BACKEND)?;
        store.records.extend_from_slice(records);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;
        store.info.check_query(vector, BACKEND)?;
        Ok(top_k(&store.records, vector, k))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(store.records.len())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::document::Chunk;

    fn record(id: &str, vector: Vec<f32>) -> EmbeddedRecord {
        EmbeddedRecord {
            chunk: Chunk {
                id: id.into(),
                text: format!("text of {id}"),
                metadata: HashMap::new(),
                document_id: "doc".into(),
            },
            vector,
        }
    }

    #[tokio::test]
    async fn empty_collection_returns_no_results() {
        let store = InMemoryVectorStore::new();
        store.create_collection(&CollectionInfo::new("db", 2, "m")).await.unwrap();
        assert!(store.query("db", &[1.0, 0.0], 4).await.unwrap().is_empty());
        assert!(store.query("db", &[1.0, 0.0], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn results_are_nearest_first_and_bounded() {
        let store = InMemoryVectorStore::new();
        store.create_collection(&CollectionInfo::new("db", 2, "m")).await.unwrap();
        store
            .add(
                "db",
                &[
                    record("far", vec![0.0, 1.0]),
                    record("near", vec![1.0, 0.0]),
                    record("mid", vec![1.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let results = store.query("db", &[1.0, 0.1], 2).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.record.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert_eq!(store.count("db").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn wrong_dimension_batch_is_rejected_whole() {
        let store = InMemoryVectorStore::new();
        store.create_collection(&CollectionInfo::new("db", 2, "m")).await.unwrap();
        let err = store
            .add("db", &[record("ok", vec![1.0, 0.0]), record("bad", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::VectorStore { .. }));
        assert_eq!(store.count("db").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn collections_are_independent() {
        let store = InMemoryVectorStore::new();
        store.create_collection(&CollectionInfo::new("db", 2, "m")).await.unwrap();
        store.create_collection(&CollectionInfo::new("db_emails", 2, "m")).await.unwrap();
        store.add("db_emails", &[record("e", vec![1.0, 0.0])]).await.unwrap();

        assert_eq!(store.count("db").await.unwrap(), 0);
        assert_eq!(store.count("db_emails").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn query_from_another_model_is_rejected() {
        let store = InMemoryVectorStore::new();
        store.create_collection(&CollectionInfo::new("db", 3, "m")).await.unwrap();
        store.add("db", &[record("a", vec![1.0, 0.0, 0.0])]).await.unwrap();

        let err = store.query("db", &[1.0, 0.0], 1).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStore { .. }));
    }

    #[tokio::test]
    async fn unknown_collection_is_an_error() {
        let store = InMemoryVectorStore::new();
        assert!(store.query("nope", &[1.0], 1).await.is_err());
    }
}
