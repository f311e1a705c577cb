//! Conversation history persisted as a JSON array of `{query, answer}` turns.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, error};

use crate::document::Turn;
use crate::error::{RagError, Result};
use crate::persist::write_json_atomic;

/// Append-only conversation log backed by a single JSON file.
///
/// The whole sequence is rewritten on every append. A turn becomes part of
/// the in-memory history only once it has been written to disk, so a failed
/// save leaves both the file and [`turns`](HistoryStore::turns) unchanged.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    turns: Vec<Turn>,
}

impl HistoryStore {
    /// Open the history at `path`, loading any previously saved turns.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let turns = Self::load(&path).await?;
        Ok(Self { path, turns })
    }

    /// Read the turns saved at `path`. A missing file is an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::History`] if the file exists but is unreadable or
    /// not a JSON array of turns.
    pub async fn load(path: &Path) -> Result<Vec<Turn>> {
        if !fs::try_exists(path).await? {
            debug!(path = %path.display(), "no history file, starting empty");
            return Ok(Vec::new());
        }

        let raw = fs::read(path).await.map_err(|e| {
            RagError::History(format!("failed to read {}: {e}", path.display()))
        })?;
        let turns: Vec<Turn> = serde_json::from_slice(&raw).map_err(|e| {
            error!(path = %path.display(), error = %e, "history file is corrupt");
            RagError::History(format!("failed to parse {}: {e}", path.display()))
        })?;

        debug!(path = %path.display(), turns = turns.len(), "loaded history");
        Ok(turns)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All turns in insertion order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append `turn` and persist the full sequence.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::History`] if the file could not be written; the
    /// turn is then not recorded.
    pub async fn append_and_save(&mut self, turn: Turn) -> Result<()> {
        let mut updated = Vec::with_capacity(self.turns.len() + 1);
        updated.extend_from_slice(&self.turns);
        updated.push(turn);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                RagError::History(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        write_json_atomic(&self.path, &updated).await.map_err(|e| {
            error!(path = %self.path.display(), error = %e, "failed to save history");
            RagError::History(format!("failed to write {}: {e}", self.path.display()))
        })?;

        self.turns = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(dir.path().join("chat_history.json")).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn turns_survive_reopen_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_history.json");

        let mut store = HistoryStore::open(&path).await.unwrap();
        for i in 0..3 {
            store.append_and_save(Turn::new(format!("q{i}"), format!("a{i}"))).await.unwrap();
        }

        let reopened = HistoryStore::load(&path).await.unwrap();
        assert_eq!(
            reopened,
            vec![Turn::new("q0", "a0"), Turn::new("q1", "a1"), Turn::new("q2", "a2")]
        );
    }

    #[tokio::test]
    async fn file_is_a_plain_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_history.json");
        let mut store = HistoryStore::open(&path).await.unwrap();
        store.append_and_save(Turn::new("hi", "hello")).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value, serde_json::json!([{"query": "hi", "answer": "hello"}]));
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_history.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = HistoryStore::open(&path).await.unwrap_err();
        assert!(matches!(err, RagError::History(_)));
    }

    #[tokio::test]
    async fn failed_save_does_not_record_the_turn() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the final rename fail.
        let path = dir.path().join("chat_history.json");
        std::fs::create_dir(&path).unwrap();

        let mut store = HistoryStore { path, turns: Vec::new() };
        assert!(store.append_and_save(Turn::new("q", "a")).await.is_err());
        assert!(store.is_empty());
    }
}
