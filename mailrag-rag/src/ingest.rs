//! Directory ingestion: parse source files, index them, move them aside.
//!
//! Files are processed one at a time in name order. A file is moved to the
//! processed directory only after all of its chunks are stored; a file that
//! fails to parse, embed or store stays where it is and is reported in the
//! [`IngestReport`]. One bad file never stops the batch.
//!
//! A file whose name is already taken in the processed directory is skipped
//! before anything is embedded. A file whose records were stored is never
//! reported as skipped, even if moving it fails afterwards.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::document::{Document, Email};
use crate::error::{RagError, Result};
use crate::indexer::Indexer;

/// Turns the raw bytes of one source file into documents.
pub trait SourceParser: Send + Sync {
    /// File extensions (without the dot, lowercase) this parser accepts.
    fn extensions(&self) -> &[&str];

    /// Parse `contents`, read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Parse`] if the contents are malformed.
    fn parse(&self, path: &Path, contents: &[u8]) -> Result<Vec<Document>>;
}

/// Parses `*.json` files holding an array of [`Email`] objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailJsonParser;

impl SourceParser for EmailJsonParser {
    fn extensions(&self) -> &[&str] {
        &["json"]
    }

    fn parse(&self, path: &Path, contents: &[u8]) -> Result<Vec<Document>> {
        let emails: Vec<Email> = serde_json::from_slice(contents).map_err(|e| RagError::Parse {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(emails.into_iter().map(Email::into_document).collect())
    }
}

/// Reads `*.txt` and `*.md` files as one document each.
///
/// The document id is the file stem; metadata carries the file name as
/// `source` and the stem as `title`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextParser;

impl SourceParser for PlainTextParser {
    fn extensions(&self) -> &[&str] {
        &["txt", "md"]
    }

    fn parse(&self, path: &Path, contents: &[u8]) -> Result<Vec<Document>> {
        let text = String::from_utf8(contents.to_vec()).map_err(|e| RagError::Parse {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })?;

        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let file_name =
            path.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();

        Ok(vec![Document {
            id: stem.clone(),
            text,
            metadata: HashMap::from([
                ("source".to_string(), file_name),
                ("title".to_string(), stem),
            ]),
            source_uri: Some(path.display().to_string()),
        }])
    }
}

/// A source file that was left in place.
#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub error: RagError,
}

/// Outcome of one [`Ingestor::ingest_directory`] run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Files stored and moved to the processed directory.
    pub ingested: Vec<PathBuf>,
    /// Files left in the source directory, with the reason.
    pub skipped: Vec<SkippedFile>,
    /// Files stored but not moved; remove them by hand before the next run.
    pub unmoved: Vec<SkippedFile>,
    /// Documents parsed from ingested files.
    pub documents: usize,
    /// Chunks stored from ingested files.
    pub chunks: usize,
}

impl IngestReport {
    pub fn has_failures(&self) -> bool {
        !self.skipped.is_empty() || !self.unmoved.is_empty()
    }
}

struct FileOutcome {
    documents: usize,
    chunks: usize,
    move_error: Option<RagError>,
}

/// Feeds a directory of source files through an [`Indexer`].
pub struct Ingestor<P> {
    indexer: Indexer,
    parser: P,
}

impl<P: SourceParser> Ingestor<P> {
    pub fn new(indexer: Indexer, parser: P) -> Self {
        Self { indexer, parser }
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    /// Ingest every matching file in `source` into `collection`.
    ///
    /// The collection is created if needed. Successfully stored files are
    /// moved into `processed`, which is created if missing.
    ///
    /// # Errors
    ///
    /// Only directory-level failures are returned: an unreadable `source`, an
    /// uncreatable `processed`, or a collection that conflicts with the
    /// configured embedding model. Per-file failures land in the report.
    pub async fn ingest_directory(
        &self,
        source: &Path,
        processed: &Path,
        collection: &str,
    ) -> Result<IngestReport> {
        self.indexer.create_collection(collection).await?;
        fs::create_dir_all(processed).await?;

        let files = self.list_source_files(source).await?;
        info!(source = %source.display(), collection, file_count = files.len(), "starting ingestion");

        let mut report = IngestReport::default();
        for path in files {
            match self.ingest_file(&path, processed, collection).await {
                Ok(outcome) => {
                    report.documents += outcome.documents;
                    report.chunks += outcome.chunks;
                    if let Some(e) = outcome.move_error {
                        error!(path = %path.display(), error = %e, "stored file could not be moved");
                        report.unmoved.push(SkippedFile { path: path.clone(), error: e });
                    }
                    report.ingested.push(path);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping file");
                    report.skipped.push(SkippedFile { path, error: e });
                }
            }
        }

        info!(
            collection,
            ingested = report.ingested.len(),
            skipped = report.skipped.len(),
            unmoved = report.unmoved.len(),
            chunks = report.chunks,
            "ingestion finished"
        );
        Ok(report)
    }

    async fn list_source_files(&self, source: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(source).await.map_err(|e| {
            error!(source = %source.display(), error = %e, "cannot read source directory");
            e
        })?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| self.parser.extensions().contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if matches {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn ingest_file(
        &self,
        path: &Path,
        processed: &Path,
        collection: &str,
    ) -> Result<FileOutcome> {
        let file_name = path.file_name().ok_or_else(|| RagError::Parse {
            source_name: path.display().to_string(),
            message: "path has no file name".to_string(),
        })?;
        let destination = processed.join(file_name);
        if fs::try_exists(&destination).await? {
            return Err(RagError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", destination.display()),
            )));
        }

        let contents = fs::read(path).await?;
        let documents = self.parser.parse(path, &contents)?;
        debug!(path = %path.display(), document_count = documents.len(), "parsed file");

        let records = self.indexer.index(collection, &documents).await?;
        let move_error = move_file(path, &destination).await.err();

        Ok(FileOutcome { documents: documents.len(), chunks: records.len(), move_error })
    }
}

/// Rename `from` to `to`, copying across filesystems when rename fails.
async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    fs::copy(from, to).await?;
    fs::remove_file(from).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_parser_reads_an_array() {
        let json = br#"[{"threadId":"t1","messageId":"m1","to":"bob@x.com","from":"alice@x.com",
            "subject":"Budget","body":"approved","time":"10:00","date":"2024-01-02"}]"#;
        let docs = EmailJsonParser.parse(Path::new("a.json"), json).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "m1");
        assert_eq!(docs[0].metadata["from"], "alice@x.com");
    }

    #[test]
    fn email_parser_rejects_missing_fields() {
        let json = br#"[{"threadId":"t1","messageId":"m1"}]"#;
        let err = EmailJsonParser.parse(Path::new("bad.json"), json).unwrap_err();
        match err {
            RagError::Parse { source_name, .. } => assert_eq!(source_name, "bad.json"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn plain_text_parser_uses_the_file_stem() {
        let docs = PlainTextParser.parse(Path::new("notes/q3-plan.md"), b"# Plan").unwrap();
        assert_eq!(docs[0].id, "q3-plan");
        assert_eq!(docs[0].metadata["source"], "q3-plan.md");
        assert_eq!(docs[0].metadata["title"], "q3-plan");
        assert_eq!(docs[0].text, "# Plan");
    }
}
