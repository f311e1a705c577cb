//! Completion provider trait for the language model that writes answers.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that turns a prompt into a textual completion.
///
/// Implementations wrap a hosted language model behind a single call. They
/// fail with [`RagError::Generation`](crate::RagError::Generation) on
/// transport, auth or quota errors and when the model returns no text. No
/// retries happen at this layer.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete `prompt` and return the model's text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Return the model name.
    fn model(&self) -> &str;
}
