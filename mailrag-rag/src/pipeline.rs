//! Chat pipeline orchestrator.
//!
//! A [`ChatPipeline`] is an ordered list of named [`Stage`]s run over one
//! shared [`PipelineState`]. The standard pipeline is
//!
//! ```text
//! START → retrieve_docs → retrieve_emails → generate → END
//! ```
//!
//! Stages only add to the state: `query` and `history` are fixed when the run
//! starts and cannot be changed by a stage. The first failing stage aborts the
//! run and its error is returned wrapped in [`RagError::Stage`].
//!
//! # Example
//!
//! ```rust,ignore
//! use mailrag_rag::{ChatPipeline, Generator, Retriever};
//!
//! let pipeline = ChatPipeline::standard(retriever, generator, "db", "db_emails", 4);
//! let state = pipeline.run("What did Alice say about the budget?", history).await?;
//! println!("{}", state.answer().unwrap_or_default());
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::document::{Chunk, Turn};
use crate::error::{RagError, Result};
use crate::generator::Generator;
use crate::retriever::Retriever;

/// Per-query state shared by the stages of one pipeline run.
///
/// Exists only for the duration of a run; nothing here is persisted.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    query: String,
    history: Vec<Turn>,
    /// Chunks retrieved from the documents collection.
    pub docs: Vec<Chunk>,
    /// Chunks retrieved from the emails collection.
    pub emails: Vec<Chunk>,
    /// The generated answer, set by the generation stage.
    pub answer: Option<String>,
}

impl PipelineState {
    pub fn new(query: impl Into<String>, history: Vec<Turn>) -> Self {
        Self { query: query.into(), history, ..Default::default() }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    /// Documents first, then emails, each in retrieval order.
    pub fn context(&self) -> Vec<Chunk> {
        self.docs.iter().chain(self.emails.iter()).cloned().collect()
    }
}

/// One named step of a [`ChatPipeline`].
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name, used in logs and in [`RagError::Stage`].
    fn name(&self) -> &str;

    /// Read what earlier stages produced and add this stage's output.
    async fn run(&self, state: &mut PipelineState) -> Result<()>;
}

/// Which [`PipelineState`] slot a [`RetrieveStage`] fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalTarget {
    Docs,
    Emails,
}

/// Retrieves the top-k chunks of one collection for the state's query.
pub struct RetrieveStage {
    name: String,
    retriever: Retriever,
    collection: String,
    target: RetrievalTarget,
    top_k: usize,
}

impl RetrieveStage {
    pub fn new(
        name: impl Into<String>,
        retriever: Retriever,
        collection: impl Into<String>,
        target: RetrievalTarget,
        top_k: usize,
    ) -> Self {
        Self { name: name.into(), retriever, collection: collection.into(), target, top_k }
    }
}

#[async_trait]
impl Stage for RetrieveStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, state: &mut PipelineState) -> Result<()> {
        let chunks = self.retriever.retrieve(&self.collection, state.query(), self.top_k).await?;
        match self.target {
            RetrievalTarget::Docs => state.docs = chunks,
            RetrievalTarget::Emails => state.emails = chunks,
        }
        Ok(())
    }
}

/// Generates the answer from the retrieved context and the history.
pub struct GenerateStage {
    generator: Generator,
}

impl GenerateStage {
    pub const NAME: &'static str = "generate";

    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Stage for GenerateStage {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self, state: &mut PipelineState) -> Result<()> {
        let context = state.context();
        let answer = self.generator.generate(state.query(), &context, state.history()).await?;
        state.answer = Some(answer);
        Ok(())
    }
}

/// A linear pipeline of stages. Construct one via [`ChatPipeline::builder()`]
/// or [`ChatPipeline::standard()`].
pub struct ChatPipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl ChatPipeline {
    pub const RETRIEVE_DOCS: &'static str = "retrieve_docs";
    pub const RETRIEVE_EMAILS: &'static str = "retrieve_emails";

    /// Create a new [`ChatPipelineBuilder`].
    pub fn builder() -> ChatPipelineBuilder {
        ChatPipelineBuilder::default()
    }

    /// The documents → emails → generate pipeline.
    pub fn standard(
        retriever: Retriever,
        generator: Generator,
        docs_collection: impl Into<String>,
        emails_collection: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self::builder()
            .stage(Arc::new(RetrieveStage::new(
                Self::RETRIEVE_DOCS,
                retriever.clone(),
                docs_collection,
                RetrievalTarget::Docs,
                top_k,
            )))
            .stage(Arc::new(RetrieveStage::new(
                Self::RETRIEVE_EMAILS,
                retriever,
                emails_collection,
                RetrievalTarget::Emails,
                top_k,
            )))
            .stage(Arc::new(GenerateStage::new(generator)))
            .build()
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order for `query` and return the final state.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Stage`] naming the first stage that failed; later
    /// stages do not run.
    pub async fn run(&self, query: &str, history: Vec<Turn>) -> Result<PipelineState> {
        let mut state = PipelineState::new(query, history);

        for stage in &self.stages {
            debug!(stage = stage.name(), "entering stage");
            stage.run(&mut state).await.map_err(|e| {
                error!(stage = stage.name(), error = %e, "stage failed");
                RagError::Stage { stage: stage.name().to_string(), source: Box::new(e) }
            })?;
        }

        info!(
            docs = state.docs.len(),
            emails = state.emails.len(),
            answered = state.answer.is_some(),
            "pipeline completed"
        );
        Ok(state)
    }
}

/// Builder for constructing a [`ChatPipeline`] one stage at a time.
#[derive(Default)]
pub struct ChatPipelineBuilder {
    stages: Vec<Arc<dyn Stage>>,
}

impl ChatPipelineBuilder {
    /// Append a stage; stages run in the order they were added.
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> ChatPipeline {
        ChatPipeline { stages: self.stages }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Stage for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self, state: &mut PipelineState) -> Result<()> {
            self.log.lock().unwrap().push(format!("{}:{}", self.name, state.query()));
            if self.fail {
                return Err(RagError::Embedding { provider: "fake".into(), message: "boom".into() });
            }
            state.answer = Some(self.name.to_string());
            Ok(())
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>, fail: bool) -> Arc<dyn Stage> {
        Arc::new(Recorder { name, log: log.clone(), fail })
    }

    #[tokio::test]
    async fn stages_run_in_order_and_share_state() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = ChatPipeline::builder()
            .stage(recorder("first", &log, false))
            .stage(recorder("second", &log, false))
            .build();

        let state = pipeline.run("hello", vec![Turn::new("q", "a")]).await.unwrap();

        assert_eq!(pipeline.stage_names(), vec!["first", "second"]);
        assert_eq!(*log.lock().unwrap(), vec!["first:hello", "second:hello"]);
        assert_eq!(state.answer(), Some("second"));
        assert_eq!(state.query(), "hello");
        assert_eq!(state.history().len(), 1);
    }

    #[tokio::test]
    async fn failing_stage_aborts_the_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = ChatPipeline::builder()
            .stage(recorder("first", &log, true))
            .stage(recorder("second", &log, false))
            .build();

        let err = pipeline.run("hello", Vec::new()).await.unwrap_err();

        match &err {
            RagError::Stage { stage, .. } => assert_eq!(stage, "first"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(err.root_cause(), RagError::Embedding { .. }));
        assert_eq!(log.lock().unwrap().len(), 1);
    }
}
