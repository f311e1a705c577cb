//! A chat session: one pipeline plus the persisted conversation.

use anyhow::{Context, Result, anyhow};
use mailrag_rag::{
    ChatPipeline, CollectionInfo, Generator, HistoryStore, RagError, Retriever, Turn, VectorStore,
};
use tracing::{info, warn};

use crate::settings::Settings;

/// The answer to one question.
#[derive(Debug)]
pub struct Reply {
    pub answer: String,
    /// Set when the turn could not be written to the history file.
    pub unsaved: Option<RagError>,
}

pub struct Session {
    pipeline: ChatPipeline,
    history: HistoryStore,
}

impl Session {
    pub fn new(pipeline: ChatPipeline, history: HistoryStore) -> Self {
        Self { pipeline, history }
    }

    /// Connect to the configured services, open both collections and load
    /// the history file.
    pub async fn open(settings: &Settings) -> Result<Self> {
        let embedder = settings.embedding_provider()?;
        let completion = settings.completion_provider()?;
        let store = settings.vector_store();

        // Fails on a store built with a different embedding model.
        for name in [&settings.docs_collection, &settings.emails_collection] {
            let collection = CollectionInfo::new(name.as_str(), embedder.dimensions(), embedder.model());
            store
                .create_collection(&collection)
                .await
                .with_context(|| format!("cannot open collection '{name}'"))?;
        }

        let mut retriever = Retriever::new(embedder, store);
        if let Some(threshold) = settings.rag.similarity_threshold {
            retriever = retriever.with_similarity_threshold(threshold);
        }
        let generator = Generator::new(completion).with_history_window(settings.rag.history_window);
        let pipeline = ChatPipeline::standard(
            retriever,
            generator,
            settings.docs_collection.as_str(),
            settings.emails_collection.as_str(),
            settings.rag.top_k,
        );

        let history = HistoryStore::open(&settings.history_file).await.with_context(|| {
            format!("cannot load history from {}", settings.history_file.display())
        })?;
        info!(turns = history.len(), "session ready");

        Ok(Self::new(pipeline, history))
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Answer `query` and record the turn.
    ///
    /// A failed run records nothing. If the answer cannot be saved it is still
    /// returned with [`Reply::unsaved`] set, and the turn is left out of the
    /// history.
    pub async fn ask(&mut self, query: &str) -> Result<Reply> {
        let state = self.pipeline.run(query, self.history.turns().to_vec()).await?;
        let answer = state
            .answer()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("pipeline finished without an answer"))?;

        let turn = Turn::new(query, answer.as_str());
        let unsaved = match self.history.append_and_save(turn).await {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "answer was not saved to the history");
                Some(e)
            }
        };
        Ok(Reply { answer, unsaved })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use mailrag_rag::{
        Chunk, CompletionProvider, EmbeddedRecord, EmbeddingProvider, InMemoryVectorStore,
    };

    use super::*;

    struct OneHot;

    #[async_trait]
    impl EmbeddingProvider for OneHot {
        async fn embed(&self, _text: &str) -> mailrag_rag::Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model(&self) -> &str {
            "one-hot"
        }
    }

    struct Echo {
        fail: bool,
    }

    #[async_trait]
    impl CompletionProvider for Echo {
        async fn complete(&self, prompt: &str) -> mailrag_rag::Result<String> {
            if self.fail {
                return Err(RagError::Generation { provider: "echo".into(), message: "down".into() });
            }
            Ok(format!("{} chars of prompt", prompt.len()))
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    async fn session(dir: &std::path::Path, fail: bool) -> Session {
        session_with_history(&dir.join("chat_history.json"), fail).await
    }

    async fn session_with_history(history_file: &std::path::Path, fail: bool) -> Session {
        let store = Arc::new(InMemoryVectorStore::new());
        for name in ["db", "db_emails"] {
            store.create_collection(&CollectionInfo::new(name, 2, "one-hot")).await.unwrap();
        }
        store
            .add(
                "db_emails",
                &[EmbeddedRecord {
                    chunk: Chunk {
                        id: "m1_0".into(),
                        text: "Alice: the budget is approved".into(),
                        metadata: HashMap::new(),
                        document_id: "m1".into(),
                    },
                    vector: vec![1.0, 0.0],
                }],
            )
            .await
            .unwrap();

        let pipeline = ChatPipeline::standard(
            Retriever::new(Arc::new(OneHot), store),
            Generator::new(Arc::new(Echo { fail })),
            "db",
            "db_emails",
            4,
        );
        let history = HistoryStore::open(history_file).await.unwrap();
        Session::new(pipeline, history)
    }

    #[tokio::test]
    async fn successful_turns_are_recorded_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), false).await;

        assert!(session.ask("first").await.unwrap().unsaved.is_none());
        assert!(session.ask("second").await.unwrap().unsaved.is_none());

        let saved = HistoryStore::load(&dir.path().join("chat_history.json")).await.unwrap();
        let queries: Vec<_> = saved.iter().map(|t| t.query.as_str()).collect();
        assert_eq!(queries, vec!["first", "second"]);
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn failed_turns_are_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), true).await;

        assert!(session.ask("budget?").await.is_err());
        assert!(session.history().is_empty());
        assert!(!dir.path().join("chat_history.json").exists());
    }

    #[tokio::test]
    async fn unsaved_answer_is_flagged_and_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let history_file = dir.path().join("state").join("chat_history.json");
        let mut session = session_with_history(&history_file, false).await;
        // A plain file where the history directory should be.
        std::fs::write(dir.path().join("state"), "").unwrap();

        let reply = session.ask("budget?").await.unwrap();
        assert!(!reply.answer.is_empty());
        assert!(reply.unsaved.is_some());
        assert!(session.history().is_empty());
        assert!(!history_file.exists());
    }
}
