//! Data types for emails, documents, chunks, records and conversation turns.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An email as exported to the ingestion source directory.
///
/// Every field is required; a missing field fails deserialization and the
/// whole file is skipped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub thread_id: String,
    pub message_id: String,
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub time: String,
    pub date: String,
}

impl Email {
    /// The text that gets chunked and embedded for this email.
    ///
    /// Headers are folded into the text so that queries about senders,
    /// subjects or dates match on content and not only on metadata.
    pub fn full_text(&self) -> String {
        format!(
            "Subject: {}\nFrom: {}\nTo: {}\nDate: {} {}\n\n{}",
            self.subject, self.from, self.to, self.date, self.time, self.body
        )
    }

    /// Provenance metadata attached to every chunk of this email.
    pub fn metadata(&self) -> HashMap<String, String> {
        HashMap::from([
            ("threadId".to_string(), self.thread_id.clone()),
            ("messageId".to_string(), self.message_id.clone()),
            ("from".to_string(), self.from.clone()),
            ("to".to_string(), self.to.clone()),
            ("subject".to_string(), self.subject.clone()),
            ("date".to_string(), self.date.clone()),
        ])
    }

    /// Convert into a [`Document`] keyed by the message id.
    pub fn into_document(self) -> Document {
        Document {
            id: self.message_id.clone(),
            text: self.full_text(),
            metadata: self.metadata(),
            source_uri: None,
        }
    }
}

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

/// A bounded-length segment of a [`Document`] with provenance metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk (`{document_id}_{chunk_index}`).
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Metadata inherited from the parent document plus `chunk_index`.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

/// A [`Chunk`] together with its embedding, as persisted in a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedRecord {
    #[serde(flatten)]
    pub chunk: Chunk,
    /// The vector embedding of the chunk's text.
    pub vector: Vec<f32>,
}

/// A retrieved [`EmbeddedRecord`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved record.
    pub record: EmbeddedRecord,
    /// Cosine similarity to the query vector (higher is nearer).
    pub score: f32,
}

/// One query/answer exchange of the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub query: String,
    pub answer: String,
}

impl Turn {
    pub fn new(query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { query: query.into(), answer: answer.into() }
    }
}
