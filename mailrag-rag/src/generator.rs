//! Prompt assembly and answer generation.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, error};

use crate::completion::CompletionProvider;
use crate::document::{Chunk, Turn};
use crate::error::Result;

const PREAMBLE: &str = "You are an AI email assistant. Use the following email/document \
                        context and chat history to respond appropriately.";

/// Builds the answer prompt and hands it to a [`CompletionProvider`].
#[derive(Clone)]
pub struct Generator {
    completion_provider: Arc<dyn CompletionProvider>,
    history_window: usize,
}

impl Generator {
    /// Default number of trailing history turns included in the prompt.
    pub const DEFAULT_HISTORY_WINDOW: usize = 5;

    pub fn new(completion_provider: Arc<dyn CompletionProvider>) -> Self {
        Self { completion_provider, history_window: Self::DEFAULT_HISTORY_WINDOW }
    }

    /// Include at most `turns` of the most recent history in each prompt.
    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    /// Assemble the prompt for `query`.
    ///
    /// The last `history_window` turns appear oldest first as `User:`/`AI:`
    /// lines, followed by the text of every context chunk in the given order
    /// separated by blank lines, followed by the query.
    pub fn build_prompt(&self, query: &str, context: &[Chunk], history: &[Turn]) -> String {
        let recent = &history[history.len().saturating_sub(self.history_window)..];
        let mut formatted_history = String::new();
        for turn in recent {
            let _ = writeln!(formatted_history, "User: {}", turn.query);
            let _ = writeln!(formatted_history, "AI: {}", turn.answer);
        }

        let context = context.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join("\n\n");

        format!(
            "{PREAMBLE}\n\nChat History:\n{formatted_history}\n\nContext:\n{context}\n\n\
             Current User Query:\n{query}\n\nAnswer:"
        )
    }

    /// Generate an answer to `query` from `context` and `history`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`](crate::RagError::Generation) when the
    /// completion service fails. Nothing is retried.
    pub async fn generate(&self, query: &str, context: &[Chunk], history: &[Turn]) -> Result<String> {
        let prompt = self.build_prompt(query, context, history);
        debug!(
            model = self.completion_provider.model(),
            context_chunks = context.len(),
            prompt_len = prompt.len(),
            "generating answer"
        );

        self.completion_provider.complete(&prompt).await.map_err(|e| {
            error!(error = %e, "generation failed");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::RagError;

    #[derive(Default)]
    struct RecordingCompletion {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionProvider for RecordingCompletion {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("ok".to_string())
        }

        fn model(&self) -> &str {
            "recording"
        }
    }

    struct FailingCompletion;

    #[async_trait]
    impl CompletionProvider for FailingCompletion {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(RagError::Generation { provider: "fake".into(), message: "down".into() })
        }

        fn model(&self) -> &str {
            "failing"
        }
    }

    fn chunk(text: &str) -> Chunk {
        Chunk { id: text.into(), text: text.into(), metadata: HashMap::new(), document_id: "d".into() }
    }

    fn turns(n: usize) -> Vec<Turn> {
        (0..n).map(|i| Turn::new(format!("q{i}"), format!("a{i}"))).collect()
    }

    #[test]
    fn prompt_keeps_only_the_last_turns_in_order() {
        let generator = Generator::new(Arc::new(RecordingCompletion::default()));
        let prompt = generator.build_prompt("now?", &[], &turns(7));

        assert!(!prompt.contains("User: q0\n"));
        assert!(!prompt.contains("User: q1\n"));
        let first = prompt.find("User: q2\nAI: a2\n").unwrap();
        let last = prompt.find("User: q6\nAI: a6\n").unwrap();
        assert!(first < last);
    }

    #[test]
    fn prompt_joins_context_with_blank_lines_before_query() {
        let generator = Generator::new(Arc::new(RecordingCompletion::default()));
        let prompt =
            generator.build_prompt("What about the budget?", &[chunk("doc one"), chunk("email two")], &[]);

        assert!(prompt.starts_with(PREAMBLE));
        assert!(prompt.contains("Context:\ndoc one\n\nemail two\n\n"));
        assert!(prompt.ends_with("Current User Query:\nWhat about the budget?\n\nAnswer:"));
        let context_at = prompt.find("Context:").unwrap();
        let history_at = prompt.find("Chat History:").unwrap();
        assert!(history_at < context_at);
    }

    #[test]
    fn history_window_is_configurable() {
        let generator =
            Generator::new(Arc::new(RecordingCompletion::default())).with_history_window(1);
        let prompt = generator.build_prompt("q", &[], &turns(3));
        assert!(prompt.contains("User: q2\nAI: a2\n"));
        assert!(!prompt.contains("User: q1"));
    }

    #[tokio::test]
    async fn generate_sends_prompt_to_the_model() {
        let completion = Arc::new(RecordingCompletion::default());
        let generator = Generator::new(completion.clone());

        let answer = generator.generate("hi", &[chunk("ctx")], &[]).await.unwrap();

        assert_eq!(answer, "ok");
        let prompts = completion.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("ctx"));
    }

    #[tokio::test]
    async fn generation_failure_propagates() {
        let generator = Generator::new(Arc::new(FailingCompletion));
        let err = generator.generate("hi", &[], &[]).await.unwrap_err();
        assert!(matches!(err, RagError::Generation { .. }));
    }
}
