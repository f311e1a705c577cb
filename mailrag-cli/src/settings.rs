//! Resolved runtime settings and the service clients built from them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use mailrag_rag::gemini::{GeminiCompletionProvider, GeminiEmbeddingProvider};
use mailrag_rag::openai::{OpenAICompletionProvider, OpenAIEmbeddingProvider};
use mailrag_rag::{CompletionProvider, EmbeddingProvider, FileVectorStore, RagConfig};

use crate::cli::{GlobalArgs, ProviderKind};

/// Everything a command needs, validated up front.
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: ProviderKind,
    pub store_dir: PathBuf,
    pub history_file: PathBuf,
    pub docs_collection: String,
    pub emails_collection: String,
    pub rag: RagConfig,
    pub embedding_model: Option<String>,
    pub completion_model: Option<String>,
    pub timeout: Duration,
}

impl Settings {
    pub fn from_args(args: &GlobalArgs) -> Result<Self> {
        let mut builder = RagConfig::builder()
            .chunk_size(args.chunk_size)
            .chunk_overlap(args.chunk_overlap)
            .chunker(args.chunker)
            .top_k(args.top_k)
            .history_window(args.history_window);
        if let Some(threshold) = args.similarity_threshold {
            builder = builder.similarity_threshold(threshold);
        }
        let rag = builder.build().context("invalid retrieval settings")?;

        anyhow::ensure!(
            args.docs_collection != args.emails_collection,
            "documents and emails collections must differ (both are '{}')",
            args.docs_collection
        );

        Ok(Self {
            provider: args.provider,
            store_dir: args.store_dir.clone(),
            history_file: args.history_file.clone(),
            docs_collection: args.docs_collection.clone(),
            emails_collection: args.emails_collection.clone(),
            rag,
            embedding_model: args.embedding_model.clone(),
            completion_model: args.completion_model.clone(),
            timeout: Duration::from_secs(args.timeout_secs),
        })
    }

    pub fn vector_store(&self) -> Arc<FileVectorStore> {
        Arc::new(FileVectorStore::new(&self.store_dir))
    }

    /// Build the embedding client. Fails when the provider's API key is missing.
    pub fn embedding_provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        let provider: Arc<dyn EmbeddingProvider> = match self.provider {
            ProviderKind::Gemini => {
                let mut p = GeminiEmbeddingProvider::from_env()?.with_timeout(self.timeout)?;
                if let Some(model) = &self.embedding_model {
                    p = p.with_model(model);
                }
                Arc::new(p)
            }
            ProviderKind::Openai => {
                let mut p = OpenAIEmbeddingProvider::from_env()?.with_timeout(self.timeout)?;
                if let Some(model) = &self.embedding_model {
                    p = p.with_model(model);
                }
                Arc::new(p)
            }
        };
        Ok(provider)
    }

    /// Build the completion client. Fails when the provider's API key is missing.
    pub fn completion_provider(&self) -> Result<Arc<dyn CompletionProvider>> {
        let provider: Arc<dyn CompletionProvider> = match self.provider {
            ProviderKind::Gemini => {
                let mut p = GeminiCompletionProvider::from_env()?.with_timeout(self.timeout)?;
                if let Some(model) = &self.completion_model {
                    p = p.with_model(model);
                }
                Arc::new(p)
            }
            ProviderKind::Openai => {
                let mut p = OpenAICompletionProvider::from_env()?.with_timeout(self.timeout)?;
                if let Some(model) = &self.completion_model {
                    p = p.with_model(model);
                }
                Arc::new(p)
            }
        };
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn settings(args: &[&str]) -> Result<Settings> {
        let cli = Cli::try_parse_from(std::iter::once("mailrag").chain(args.iter().copied()))?;
        Settings::from_args(&cli.global)
    }

    #[test]
    fn defaults_resolve() {
        let settings = settings(&[]).unwrap();
        assert_eq!(settings.rag, RagConfig::default());
        assert_eq!(settings.timeout, Duration::from_secs(60));
        assert_eq!(settings.history_file, PathBuf::from("chat_history.json"));
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        assert!(settings(&["--chunk-size", "100", "--chunk-overlap", "100"]).is_err());
    }

    #[test]
    fn collections_must_differ() {
        assert!(settings(&["--docs-collection", "same", "--emails-collection", "same"]).is_err());
    }

    #[test]
    fn threshold_is_optional() {
        let settings = settings(&["--similarity-threshold", "0.25"]).unwrap();
        assert_eq!(settings.rag.similarity_threshold, Some(0.25));
    }
}
