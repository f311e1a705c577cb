//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use mailrag_rag::ChunkerKind;

#[derive(Debug, Parser)]
#[command(
    name = "mailrag",
    version,
    about = "Ask questions about your email and documents",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Defaults to `chat` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn command_or_chat(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }
}

#[derive(Debug, Clone, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Start the interactive assistant
    Chat,

    /// Answer a single question and record it in the history
    Ask {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Embed exported email files into the emails collection
    IngestEmails {
        /// Directory holding `*.json` email exports
        #[arg(long, default_value = "source_emails")]
        source: PathBuf,
        /// Where successfully ingested files are moved
        #[arg(long, default_value = "dump_emails")]
        processed: PathBuf,
    },

    /// Embed text and markdown files into the documents collection
    IngestDocs {
        /// Directory holding `*.txt` and `*.md` files
        #[arg(long, default_value = "source_docs")]
        source: PathBuf,
        /// Where successfully ingested files are moved
        #[arg(long, default_value = "dump_docs")]
        processed: PathBuf,
    },

    /// Show how many records each collection holds
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    Gemini,
    Openai,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Embedding and completion service
    #[arg(long, global = true, env = "MAILRAG_PROVIDER", value_enum, default_value = "gemini")]
    pub provider: ProviderKind,

    /// Directory holding the vector store collections
    #[arg(long, global = true, env = "MAILRAG_STORE_DIR", default_value = "vector_store")]
    pub store_dir: PathBuf,

    /// Conversation history file
    #[arg(long, global = true, env = "MAILRAG_HISTORY_FILE", default_value = "chat_history.json")]
    pub history_file: PathBuf,

    #[arg(long, global = true, env = "MAILRAG_DOCS_COLLECTION", default_value = "db")]
    pub docs_collection: String,

    #[arg(long, global = true, env = "MAILRAG_EMAILS_COLLECTION", default_value = "db_emails")]
    pub emails_collection: String,

    /// Chunks retrieved from each collection per question
    #[arg(long, global = true, env = "MAILRAG_TOP_K", default_value_t = 4)]
    pub top_k: usize,

    /// Chunk size in characters
    #[arg(long, global = true, env = "MAILRAG_CHUNK_SIZE", default_value_t = 500)]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, global = true, env = "MAILRAG_CHUNK_OVERLAP", default_value_t = 100)]
    pub chunk_overlap: usize,

    #[arg(long, global = true, env = "MAILRAG_CHUNKER", default_value = "fixed")]
    pub chunker: ChunkerKind,

    /// Drop retrieved chunks scoring below this cosine similarity
    #[arg(long, global = true, env = "MAILRAG_SIMILARITY_THRESHOLD")]
    pub similarity_threshold: Option<f32>,

    /// Past turns included in each prompt
    #[arg(long, global = true, env = "MAILRAG_HISTORY_WINDOW", default_value_t = 5)]
    pub history_window: usize,

    /// Override the provider's default embedding model
    #[arg(long, global = true, env = "MAILRAG_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Override the provider's default completion model
    #[arg(long, global = true, env = "MAILRAG_COMPLETION_MODEL")]
    pub completion_model: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long, global = true, env = "MAILRAG_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}
