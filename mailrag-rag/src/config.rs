//! Configuration for chunking, retrieval and generation.

use serde::{Deserialize, Serialize};

use crate::chunking::ChunkerKind;
use crate::error::{RagError, Result};

/// Configuration parameters shared by the indexer, retriever and generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Chunking strategy.
    pub chunker: ChunkerKind,
    /// Number of records retrieved from each collection per query.
    pub top_k: usize,
    /// Minimum similarity score for results. `None` keeps every top-k result.
    pub similarity_threshold: Option<f32>,
    /// Number of most recent conversation turns included in the prompt.
    pub history_window: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            chunker: ChunkerKind::Fixed,
            top_k: 4,
            similarity_threshold: None,
            history_window: 5,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the chunking strategy.
    pub fn chunker(mut self, kind: ChunkerKind) -> Self {
        self.config.chunker = kind;
        self
    }

    /// Set the number of results retrieved from each collection.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Set how many trailing history turns go into the prompt.
    pub fn history_window(mut self, turns: usize) -> Self {
        self.config.history_window = turns;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `history_window == 0`
    /// - `similarity_threshold` is not a finite number
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if config.history_window == 0 {
            return Err(RagError::Config("history_window must be greater than zero".to_string()));
        }
        if config.similarity_threshold.is_some_and(|t| !t.is_finite()) {
            return Err(RagError::Config("similarity_threshold must be finite".to_string()));
        }
        Ok(config)
    }
}
