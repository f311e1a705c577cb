//! Ingestion orchestrator: chunk → embed → store.
//!
//! The [`Indexer`] composes a [`Chunker`], an [`EmbeddingProvider`] and a
//! [`VectorStore`]. A batch of documents is chunked, embedded with a single
//! `embed_batch` call and written with a single `add` call, so either the
//! whole batch lands in the collection or none of it does.
//!
//! # Example
//!
//! ```rust,ignore
//! use mailrag_rag::{Indexer, InMemoryVectorStore, FixedSizeChunker};
//!
//! let indexer = Indexer::builder()
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .chunker(Arc::new(FixedSizeChunker::new(500, 100)))
//!     .build()?;
//!
//! indexer.create_collection("db_emails").await?;
//! indexer.index("db_emails", &documents).await?;
//! ```

use std::sync::Arc;

use tracing::{error, info};

use crate::chunking::Chunker;
use crate::document::{Document, EmbeddedRecord};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::{CollectionInfo, VectorStore};

/// Chunks, embeds and stores documents. Construct one via [`Indexer::builder()`].
pub struct Indexer {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
}

impl Indexer {
    /// Create a new [`IndexerBuilder`].
    pub fn builder() -> IndexerBuilder {
        IndexerBuilder::default()
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Describe a collection built with this indexer's embedding model.
    pub fn collection_info(&self, name: &str) -> CollectionInfo {
        CollectionInfo::new(
            name,
            self.embedding_provider.dimensions(),
            self.embedding_provider.model(),
        )
    }

    /// Create a named collection bound to the configured embedding model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStore`] if the collection exists with a
    /// different model or dimensionality, or the store fails.
    pub async fn create_collection(&self, name: &str) -> Result<()> {
        self.vector_store.create_collection(&self.collection_info(name)).await.map_err(|e| {
            error!(collection = name, error = %e, "failed to create collection");
            e
        })
    }

    /// Chunk and embed `documents` without storing anything.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if the embedding call fails or returns
    /// the wrong number of vectors.
    pub async fn prepare(&self, documents: &[Document]) -> Result<Vec<EmbeddedRecord>> {
        let chunks: Vec<_> = documents.iter().flat_map(|d| self.chunker.chunk(d)).collect();
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(chunk_count = chunks.len(), error = %e, "embedding failed during ingestion");
            e
        })?;

        if embeddings.len() != chunks.len() {
            return Err(RagError::Embedding {
                provider: self.embedding_provider.model().to_string(),
                message: format!(
                    "expected {} embeddings, provider returned {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }

        Ok(chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, vector)| EmbeddedRecord { chunk, vector })
            .collect())
    }

    /// Index `documents` into `collection` as one all-or-nothing unit.
    ///
    /// Returns the stored records (possibly none, for empty documents).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] or [`RagError::VectorStore`]; in either
    /// case nothing from this call is stored.
    pub async fn index(&self, collection: &str, documents: &[Document]) -> Result<Vec<EmbeddedRecord>> {
        let records = self.prepare(documents).await?;
        if records.is_empty() {
            info!(collection, document_count = documents.len(), chunk_count = 0, "nothing to index");
            return Ok(records);
        }

        self.vector_store.add(collection, &records).await.map_err(|e| {
            error!(collection, error = %e, "add failed during ingestion");
            e
        })?;

        info!(
            collection,
            document_count = documents.len(),
            chunk_count = records.len(),
            "indexed documents"
        );
        Ok(records)
    }
}

/// Builder for constructing an [`Indexer`]. All fields are required.
#[derive(Default)]
pub struct IndexerBuilder {
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl IndexerBuilder {
    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`Indexer`], validating that all fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any field is missing.
    pub fn build(self) -> Result<Indexer> {
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let chunker =
            self.chunker.ok_or_else(|| RagError::Config("chunker is required".to_string()))?;

        Ok(Indexer { embedding_provider, vector_store, chunker })
    }
}
