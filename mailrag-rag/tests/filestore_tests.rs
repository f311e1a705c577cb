//! File-backed vector store: persistence and collection invariants.

use std::collections::HashMap;

use mailrag_rag::{Chunk, CollectionInfo, EmbeddedRecord, FileVectorStore, RagError, VectorStore};

fn record(id: &str, vector: Vec<f32>) -> EmbeddedRecord {
    EmbeddedRecord {
        chunk: Chunk {
            id: id.to_string(),
            text: format!("text of {id}"),
            metadata: HashMap::from([("from".to_string(), "alice@x.com".to_string())]),
            document_id: id.to_string(),
        },
        vector,
    }
}

fn info(name: &str) -> CollectionInfo {
    CollectionInfo::new(name, 3, "mock-embedding")
}

#[tokio::test]
async fn reopened_store_returns_the_same_records() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = FileVectorStore::new(dir.path());
        store.create_collection(&info("db_emails")).await.unwrap();
        store
            .add("db_emails", &[record("a", vec![1.0, 0.0, 0.0]), record("b", vec![0.0, 1.0, 0.0])])
            .await
            .unwrap();
        store.add("db_emails", &[record("c", vec![0.0, 0.0, 1.0])]).await.unwrap();
    }

    let reopened = FileVectorStore::new(dir.path());
    assert_eq!(reopened.count("db_emails").await.unwrap(), 3);

    let results = reopened.query("db_emails", &[0.0, 0.9, 0.1], 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].record, record("b", vec![0.0, 1.0, 0.0]));
    assert_eq!(results[1].record.chunk.id, "c");
}

#[tokio::test]
async fn collection_layout_is_manifest_plus_records() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileVectorStore::new(dir.path());
    store.create_collection(&info("db")).await.unwrap();

    let manifest: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("db").join("collection.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(
        manifest,
        serde_json::json!({"name": "db", "dimensions": 3, "model": "mock-embedding", "metric": "cosine"})
    );
    let records = std::fs::read_to_string(dir.path().join("db").join("records.json")).unwrap();
    assert_eq!(serde_json::from_str::<Vec<EmbeddedRecord>>(&records).unwrap(), vec![]);
}

#[tokio::test]
async fn wrong_dimensionality_is_rejected_and_nothing_is_stored() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileVectorStore::new(dir.path());
    store.create_collection(&info("db_emails")).await.unwrap();

    let err = store
        .add("db_emails", &[record("ok", vec![1.0, 0.0, 0.0]), record("bad", vec![1.0, 0.0])])
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::VectorStore { .. }));
    assert_eq!(store.count("db_emails").await.unwrap(), 0);
    assert_eq!(FileVectorStore::new(dir.path()).count("db_emails").await.unwrap(), 0);
}

#[tokio::test]
async fn reopening_with_a_different_model_fails() {
    let dir = tempfile::tempdir().unwrap();
    FileVectorStore::new(dir.path()).create_collection(&info("db")).await.unwrap();

    let reopened = FileVectorStore::new(dir.path());
    let err = reopened
        .create_collection(&CollectionInfo::new("db", 3, "another-model"))
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::VectorStore { .. }));

    // The original binding still works.
    reopened.create_collection(&info("db")).await.unwrap();
}

#[tokio::test]
async fn empty_collection_queries_return_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileVectorStore::new(dir.path());
    store.create_collection(&info("db")).await.unwrap();

    assert!(store.query("db", &[1.0, 0.0, 0.0], 4).await.unwrap().is_empty());
    assert!(store.query("db", &[1.0, 0.0, 0.0], 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn query_with_wrong_dimensions_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = FileVectorStore::new(dir.path());
        store.create_collection(&info("db")).await.unwrap();
        store.add("db", &[record("a", vec![1.0, 0.0, 0.0])]).await.unwrap();
        assert!(matches!(
            store.query("db", &[1.0, 0.0], 1).await,
            Err(RagError::VectorStore { .. })
        ));
    }

    let reopened = FileVectorStore::new(dir.path());
    assert!(matches!(
        reopened.query("db", &[1.0, 0.0, 0.0, 0.0], 1).await,
        Err(RagError::VectorStore { .. })
    ));
    assert_eq!(reopened.query("db", &[1.0, 0.0, 0.0], 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_or_invalid_collections_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileVectorStore::new(dir.path());

    assert!(matches!(
        store.query("missing", &[1.0, 0.0, 0.0], 4).await,
        Err(RagError::VectorStore { .. })
    ));
    assert!(matches!(
        store.create_collection(&info("../escape")).await,
        Err(RagError::VectorStore { .. })
    ));
}
