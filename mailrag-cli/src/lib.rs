//! # mailrag-cli
//!
//! The `mailrag` command: an interactive email assistant plus the commands
//! that feed it.
//!
//! ```text
//! mailrag ingest-emails --source source_emails --processed dump_emails
//! mailrag ingest-docs
//! mailrag ask What did Alice say about the budget?
//! mailrag            # interactive chat
//! ```

pub mod cli;
pub mod commands;
pub mod console;
pub mod logging;
pub mod session;
pub mod settings;

pub use cli::{Cli, Command, GlobalArgs, ProviderKind};
pub use console::{is_exit_command, run_console};
pub use session::{Reply, Session};
pub use settings::Settings;
