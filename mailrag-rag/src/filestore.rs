//! File-backed vector store.
//!
//! Provides [`FileVectorStore`], which keeps each collection in its own
//! directory under a root:
//!
//! ```text
//! <root>/<collection>/collection.json   name, dimensions, model, metric
//! <root>/<collection>/records.json      every record, in insertion order
//! ```
//!
//! Collections are loaded lazily and cached. Every [`add`](VectorStore::add)
//! rewrites `records.json` through a temporary file and a rename before it
//! returns, so a stored batch is durable and a failed write leaves the
//! previous contents untouched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::document::{EmbeddedRecord, SearchResult};
use crate::error::{RagError, Result};
use crate::persist::write_json_atomic;
use crate::vectorstore::{CollectionInfo, VectorStore, top_k};

const BACKEND: &str = "File";
const MANIFEST_FILE: &str = "collection.json";
const RECORDS_FILE: &str = "records.json";

#[derive(Debug)]
struct Collection {
    info: CollectionInfo,
    records: Vec<EmbeddedRecord>,
}

/// A [`VectorStore`] persisted as JSON files in one directory per collection.
///
/// Search is an exact cosine scan over the cached records.
///
/// # Example
///
/// ```rust,ignore
/// use mailrag_rag::{CollectionInfo, FileVectorStore, VectorStore};
///
/// let store = FileVectorStore::new("vector_store");
/// store.create_collection(&CollectionInfo::new("db_emails", 768, "text-embedding-004")).await?;
/// store.add("db_emails", &records).await?;
/// ```
#[derive(Debug)]
pub struct FileVectorStore {
    root: PathBuf,
    collections: RwLock<HashMap<String, Collection>>,
}

impl FileVectorStore {
    /// Create a store rooted at `root`. Nothing is touched on disk until a
    /// collection is created or read.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), collections: RwLock::new(HashMap::new()) }
    }

    /// The directory holding all collections.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self, name: &str) -> Result<PathBuf> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && !name.contains('\0');
        if !valid {
            return Err(RagError::store(BACKEND, format!("invalid collection name '{name}'")));
        }
        Ok(self.root.join(name))
    }

    fn io_err(name: &str, action: &str, e: impl std::fmt::Display) -> RagError {
        error!(collection = name, error = %e, "{action} failed");
        RagError::store(BACKEND, format!("{action} for collection '{name}' failed: {e}"))
    }

    /// Read a collection from disk. `Ok(None)` if it was never created.
    async fn read_collection(&self, name: &str) -> Result<Option<Collection>> {
        let dir = self.collection_dir(name)?;
        let manifest_path = dir.join(MANIFEST_FILE);
        if !fs::try_exists(&manifest_path).await.map_err(|e| Self::io_err(name, "stat", e))? {
            return Ok(None);
        }

        let manifest = fs::read(&manifest_path)
            .await
            .map_err(|e| Self::io_err(name, "reading manifest", e))?;
        let info: CollectionInfo = serde_json::from_slice(&manifest)
            .map_err(|e| Self::io_err(name, "parsing manifest", e))?;

        let records_path = dir.join(RECORDS_FILE);
        let records: Vec<EmbeddedRecord> =
            if fs::try_exists(&records_path).await.map_err(|e| Self::io_err(name, "stat", e))? {
                let raw = fs::read(&records_path)
                    .await
                    .map_err(|e| Self::io_err(name, "reading records", e))?;
                serde_json::from_slice(&raw)
                    .map_err(|e| Self::io_err(name, "parsing records", e))?
            } else {
                Vec::new()
            };

        debug!(collection = name, record_count = records.len(), "loaded collection from disk");
        Ok(Some(Collection { info, records }))
    }

    /// Make sure `name` is in the cache, loading it from disk if needed.
    async fn load_into<'a>(
        &self,
        collections: &'a mut HashMap<String, Collection>,
        name: &str,
    ) -> Result<&'a mut Collection> {
        if !collections.contains_key(name) {
            let collection = self.read_collection(name).await?.ok_or_else(|| {
                RagError::store(BACKEND, format!("collection '{name}' does not exist"))
            })?;
            collections.insert(name.to_string(), collection);
        }
        collections
            .get_mut(name)
            .ok_or_else(|| RagError::store(BACKEND, format!("collection '{name}' does not exist")))
    }
}

#[async_trait]
impl VectorStore for FileVectorStore {
    async fn create_collection(&self, info: &CollectionInfo) -> Result<()> {
        let mut collections = self.collections.write().await;
        if let Some(existing) = collections.get(&info.name) {
            return existing.info.ensure_compatible(info, BACKEND);
        }

        if let Some(existing) = self.read_collection(&info.name).await? {
            existing.info.ensure_compatible(info, BACKEND)?;
            collections.insert(info.name.clone(), existing);
            return Ok(());
        }

        let dir = self.collection_dir(&info.name)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| Self::io_err(&info.name, "creating directory", e))?;
        write_json_atomic(&dir.join(RECORDS_FILE), &Vec::<EmbeddedRecord>::new())
            .await
            .map_err(|e| Self::io_err(&info.name, "writing records", e))?;
        // The manifest goes last: its presence is what marks the collection as created.
        write_json_atomic(&dir.join(MANIFEST_FILE), info)
            .await
            .map_err(|e| Self::io_err(&info.name, "writing manifest", e))?;

        info!(
            collection = %info.name,
            dimensions = info.dimensions,
            model = %info.model,
            "created collection"
        );
        collections
            .insert(info.name.clone(), Collection { info: info.clone(), records: Vec::new() });
        Ok(())
    }

    async fn add(&self, collection: &str, records: &[EmbeddedRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut collections = self.collections.write().await;
        let store = self.load_into(&mut collections, collection).await?;
        store.info.check_records(records, BACKEND)?;

        let mut updated = Vec::with_capacity(store.records.len() + records.len());
        updated.extend_from_slice(&store.records);
        updated.extend_from_slice(records);

        let path = self.collection_dir(collection)?.join(RECORDS_FILE);
        write_json_atomic(&path, &updated)
            .await
            .map_err(|e| Self::io_err(collection, "writing records", e))?;

        store.records = updated;
        debug!(collection, added = records.len(), total = store.records.len(), "persisted records");
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        {
            let collections = self.collections.read().await;
            if let Some(store) = collections.get(collection) {
                store.info.check_query(vector, BACKEND)?;
                return Ok(top_k(&store.records, vector, k));
            }
        }

        let mut collections = self.collections.write().await;
        let store = self.load_into(&mut collections, collection).await?;
        store.info.check_query(vector, BACKEND)?;
        Ok(top_k(&store.records, vector, k))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let mut collections = self.collections.write().await;
        let store = self.load_into(&mut collections, collection).await?;
        Ok(store.records.len())
    }
}
