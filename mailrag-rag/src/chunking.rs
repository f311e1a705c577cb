//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`] - overlapping fixed-size character windows (see [`split_text`])
//! - [`RecursiveChunker`] - splits hierarchically by paragraphs, sentences, then words
//!
//! Sizes are counted in characters (Unicode scalar values), never bytes, so a
//! window boundary can never fall inside a multi-byte character.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::{Chunk, Document};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata. Embeddings are
/// attached later by the indexer.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Split `text` into overlapping windows of `chunk_size` characters.
///
/// Each window starts `chunk_size - chunk_overlap` characters after the
/// previous one and the last window ends exactly at the end of the text.
/// Text no longer than `chunk_size` yields a single chunk; empty text yields
/// none. Dropping the first `chunk_overlap` characters of every chunk but the
/// first and concatenating gives back `text`.
///
/// `chunk_overlap >= chunk_size` is rejected by [`RagConfig`](crate::RagConfig);
/// if it reaches this function anyway the step is clamped to one character.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let char_count = bounds.len();
    bounds.push(text.len());

    let step = chunk_size.saturating_sub(chunk_overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(char_count);
        chunks.push(text[bounds[start]..bounds[end]].to_string());
        if end == char_count {
            break;
        }
        start += step;
    }

    chunks
}

/// Wrap raw chunk texts into [`Chunk`]s carrying the document's metadata.
fn into_chunks(document: &Document, texts: Vec<String>) -> Vec<Chunk> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let mut metadata = document.metadata.clone();
            metadata.insert("chunk_index".to_string(), i.to_string());
            Chunk {
                id: format!("{}_{i}", document.id),
                text,
                metadata,
                document_id: document.id.clone(),
            }
        })
        .collect()
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`. Each chunk inherits
/// the parent document's metadata plus a `chunk_index` field.
///
/// # Example
///
/// ```rust,ignore
/// use mailrag_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(500, 100);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        into_chunks(document, split_text(&document.text, self.chunk_size, self.chunk_overlap))
    }
}

/// Splits text hierarchically: paragraphs → lines → sentences → words.
///
/// Segments are merged greedily up to `chunk_size` characters. When a chunk is
/// emitted, its trailing segments (up to `chunk_overlap` characters) seed the
/// next chunk. A segment that alone exceeds `chunk_size` is split with the
/// next separator, and with [`split_text`] once separators run out.
/// Separators stay attached to the preceding segment, so no text is dropped.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    const SEPARATORS: [&'static str; 6] = ["\n\n", "\n", ". ", "! ", "? ", " "];

    /// Create a new `RecursiveChunker`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

fn split_recursive(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }

    let Some((separator, remaining)) = separators.split_first() else {
        return split_text(text, chunk_size, chunk_overlap);
    };

    let segments = split_keeping_separator(text, separator);
    if segments.len() <= 1 {
        return split_recursive(text, chunk_size, chunk_overlap, remaining);
    }

    let mut chunks = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut window_len = 0;

    for segment in segments {
        let segment_len = char_len(segment);

        if segment_len > chunk_size {
            if !window.is_empty() {
                chunks.push(window.iter().copied().collect::<String>());
                window.clear();
                window_len = 0;
            }
            chunks.extend(split_recursive(segment, chunk_size, chunk_overlap, remaining));
            continue;
        }

        if window_len + segment_len > chunk_size && !window.is_empty() {
            chunks.push(window.iter().copied().collect::<String>());
            // Keep only a tail that fits the overlap budget and leaves room for the segment.
            while window_len > chunk_overlap || window_len + segment_len > chunk_size {
                let Some(dropped) = window.pop_front() else { break };
                window_len -= char_len(dropped);
            }
        }

        window.push_back(segment);
        window_len += segment_len;
    }

    if !window.is_empty() {
        chunks.push(window.iter().copied().collect::<String>());
    }

    chunks
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() || self.chunk_size == 0 {
            return Vec::new();
        }

        let texts =
            split_recursive(&document.text, self.chunk_size, self.chunk_overlap, &Self::SEPARATORS);
        into_chunks(document, texts)
    }
}

/// Which [`Chunker`] implementation to build from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkerKind {
    #[default]
    Fixed,
    Recursive,
}

impl ChunkerKind {
    /// Build the chunker this kind names.
    pub fn build(self, chunk_size: usize, chunk_overlap: usize) -> Arc<dyn Chunker> {
        match self {
            ChunkerKind::Fixed => Arc::new(FixedSizeChunker::new(chunk_size, chunk_overlap)),
            ChunkerKind::Recursive => Arc::new(RecursiveChunker::new(chunk_size, chunk_overlap)),
        }
    }
}

impl fmt::Display for ChunkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkerKind::Fixed => f.write_str("fixed"),
            ChunkerKind::Recursive => f.write_str("recursive"),
        }
    }
}

impl FromStr for ChunkerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(ChunkerKind::Fixed),
            "recursive" => Ok(ChunkerKind::Recursive),
            other => Err(format!("unknown chunker '{other}' (expected 'fixed' or 'recursive')")),
        }
    }
}
