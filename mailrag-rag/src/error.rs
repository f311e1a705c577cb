//! Error types for the `mailrag-rag` crate.

use thiserror::Error;

/// Errors that can occur while ingesting, retrieving or generating.
#[derive(Debug, Error)]
pub enum RagError {
    /// An ingestion source could not be parsed (malformed JSON, missing fields).
    #[error("Parse error ({source_name}): {message}")]
    Parse {
        /// The file or input that failed to parse.
        source_name: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding service failed (network, auth, quota, bad response).
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The completion service failed (network, auth, quota, empty response).
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The completion provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The conversation history could not be read or written.
    #[error("History error: {0}")]
    History(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A pipeline stage failed; the run was aborted at this stage.
    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        /// Name of the stage that failed.
        stage: String,
        /// The underlying failure.
        #[source]
        source: Box<RagError>,
    },

    /// A filesystem operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Shorthand for a [`RagError::VectorStore`] error.
    pub(crate) fn store(backend: &str, message: impl Into<String>) -> Self {
        Self::VectorStore { backend: backend.to_string(), message: message.into() }
    }

    /// Return the innermost error, looking through [`RagError::Stage`] wrappers.
    pub fn root_cause(&self) -> &RagError {
        match self {
            RagError::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_cause_unwraps_nested_stages() {
        let err = RagError::Stage {
            stage: "generate".into(),
            source: Box::new(RagError::Generation {
                provider: "Gemini".into(),
                message: "quota exceeded".into(),
            }),
        };

        assert!(matches!(err.root_cause(), RagError::Generation { .. }));
        assert_eq!(
            err.to_string(),
            "Stage 'generate' failed: Generation error (Gemini): quota exceeded"
        );
    }
}
