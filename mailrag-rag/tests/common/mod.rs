//! Deterministic stand-ins for the embedding and completion services.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mailrag_rag::{CompletionProvider, EmbeddingProvider, RagError, Result};

pub const DIM: usize = 32;
pub const MODEL: &str = "mock-embedding";

/// Bag-of-words embedding: each lowercase word is hashed into one of
/// [`DIM`] buckets. Texts sharing words point in similar directions.
pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIM];
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let mut hash: u32 = 0x811c_9dc5;
        for byte in word.to_lowercase().bytes() {
            hash ^= u32::from(byte);
            hash = hash.wrapping_mul(0x0100_0193);
        }
        vector[hash as usize % DIM] += 1.0;
    }
    vector
}

#[derive(Default)]
pub struct MockEmbedder {
    pub embed_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        Ok(bag_of_words(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| bag_of_words(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn model(&self) -> &str {
        MODEL
    }
}

/// An embedding service that is always down.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::Embedding { provider: "mock".into(), message: "quota exceeded".into() })
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn model(&self) -> &str {
        MODEL
    }
}

/// Records every prompt and answers with a fixed string.
pub struct MockCompletion {
    pub answer: String,
    pub prompts: Mutex<Vec<String>>,
}

impl MockCompletion {
    pub fn new(answer: impl Into<String>) -> Self {
        Self { answer: answer.into(), prompts: Mutex::new(Vec::new()) }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.answer.clone())
    }

    fn model(&self) -> &str {
        "mock-completion"
    }
}

pub struct FailingCompletion;

#[async_trait]
impl CompletionProvider for FailingCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(RagError::Generation { provider: "mock".into(), message: "service unavailable".into() })
    }

    fn model(&self) -> &str {
        "failing-completion"
    }
}
