//! Interactive line-based chat loop.

use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::session::Session;

const PROMPT: &str = "You: ";

/// `exit` or `quit`, any case, surrounding whitespace ignored.
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

/// Read questions until `exit`, `quit`, Ctrl-D or Ctrl-C.
///
/// A failed turn is printed and the loop carries on.
pub async fn run_console(session: &mut Session) -> Result<()> {
    let mut rl = DefaultEditor::new().context("failed to initialise line editor")?;

    println!("AI Email Assistant");
    println!("Type 'exit' or 'quit' to leave.\n");

    loop {
        let line = match rl.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_exit_command(input) {
            break;
        }
        if let Err(e) = rl.add_history_entry(input) {
            debug!(error = %e, "could not add line to editor history");
        }

        match session.ask(input).await {
            Ok(reply) => {
                println!("AI: {}\n", reply.answer);
                if let Some(e) = reply.unsaved {
                    eprintln!("Warning: this answer was not saved to the history: {e}\n");
                }
            }
            Err(e) => eprintln!("Error: {e:#}\n"),
        }
    }

    println!("Goodbye!");
    Ok(())
}
