//! # mailrag-rag
//!
//! Retrieval-augmented chat over an email and document corpus.
//!
//! ## Overview
//!
//! Ingestion turns source files into [`Document`]s, splits them with a
//! [`Chunker`], embeds the chunks with an [`EmbeddingProvider`] and appends
//! them to a [`VectorStore`] collection. At query time a [`ChatPipeline`]
//! retrieves the nearest chunks from the documents and emails collections,
//! then asks a [`CompletionProvider`] for an answer grounded in that context
//! and the recent [`HistoryStore`] turns.
//!
//! - [`InMemoryVectorStore`] - process-local store for tests and development
//! - [`FileVectorStore`] - JSON-on-disk store, durable on every `add`
//! - [`gemini`] - Gemini embeddings and completions (feature `gemini`)
//! - [`openai`] - OpenAI embeddings and completions (feature `openai`)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mailrag_rag::gemini::{GeminiCompletionProvider, GeminiEmbeddingProvider};
//! use mailrag_rag::{ChatPipeline, FileVectorStore, Generator, HistoryStore, Retriever, Turn};
//!
//! let embedder = Arc::new(GeminiEmbeddingProvider::from_env()?);
//! let store = Arc::new(FileVectorStore::new("vector_store"));
//! let generator = Generator::new(Arc::new(GeminiCompletionProvider::from_env()?));
//!
//! let pipeline = ChatPipeline::standard(Retriever::new(embedder, store), generator, "db", "db_emails", 4);
//! let mut history = HistoryStore::open("chat_history.json").await?;
//!
//! let query = "What did Alice say about the budget?";
//! let state = pipeline.run(query, history.turns().to_vec()).await?;
//! let answer = state.answer().unwrap_or_default().to_string();
//! history.append_and_save(Turn::new(query, answer)).await?;
//! ```

pub mod chunking;
pub mod completion;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filestore;
pub mod generator;
pub mod history;
pub mod indexer;
pub mod ingest;
pub mod inmemory;
mod persist;
pub mod pipeline;
pub mod retriever;
pub mod vectorstore;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{Chunker, ChunkerKind, FixedSizeChunker, RecursiveChunker, split_text};
pub use completion::CompletionProvider;
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, Email, EmbeddedRecord, SearchResult, Turn};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use filestore::FileVectorStore;
pub use generator::Generator;
pub use history::HistoryStore;
pub use indexer::{Indexer, IndexerBuilder};
pub use ingest::{EmailJsonParser, IngestReport, Ingestor, PlainTextParser, SkippedFile, SourceParser};
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{
    ChatPipeline, ChatPipelineBuilder, GenerateStage, PipelineState, RetrievalTarget,
    RetrieveStage, Stage,
};
pub use retriever::Retriever;
pub use vectorstore::{CollectionInfo, VectorStore};
