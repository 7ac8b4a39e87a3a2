//! Synchronization scenarios: ledger/index invariants, idempotence,
//! pruning and the failure policy of each step.

use super::support::*;
use crate::flat_index::FlatL2Index;
use crate::ledger::Ledger;
use crate::store::{DocumentStore, MemoryStore};
use crate::sync::{IndexSynchronizer, NOTHING_NEW_MESSAGE};
use crate::vector_index::VectorIndex;
use ragsync_core::AppError;
use std::collections::BTreeSet;
use std::sync::Arc;

fn synchronizer(store: &Arc<MemoryStore>, embedder: &Arc<StubEmbedder>) -> IndexSynchronizer {
    IndexSynchronizer::new(store.clone(), embedder.clone()).with_concurrency(3)
}

async fn load_state(store: &MemoryStore) -> (Ledger, FlatL2Index) {
    let ledger = Ledger::load(store, BUCKET, METADATA_KEY).await.unwrap();
    let index = FlatL2Index::load(store, BUCKET, INDEX_KEY).await.unwrap();
    (ledger, index)
}

fn assert_consistent(ledger: &Ledger, index: &FlatL2Index) {
    assert_eq!(ledger.embedded_files_sequence.len(), index.len());
    let keys: BTreeSet<&String> = ledger.embedded_files.keys().collect();
    let sequence: BTreeSet<&String> = ledger.embedded_files_sequence.iter().collect();
    assert_eq!(keys, sequence);
}

#[tokio::test]
async fn test_first_sync_embeds_everything_in_listing_order() {
    let store = seeded_store();
    let embedder = Arc::new(StubEmbedder::sample());

    let outcome = synchronizer(&store, &embedder)
        .sync(&sync_params())
        .await
        .unwrap();

    assert_eq!(outcome.num_new_embeddings, Some(3));
    assert_eq!(outcome.num_pruned, Some(0));
    assert_eq!(outcome.index_key.as_deref(), Some(INDEX_KEY));
    assert_eq!(
        outcome.message,
        "Successfully embedded 3 new files and updated vector index."
    );

    let (ledger, index) = load_state(&store).await;
    assert_consistent(&ledger, &index);
    assert_eq!(
        ledger.embedded_files_sequence,
        vec![PARIS.0, RUST.0, TOKYO.0]
    );
    assert_eq!(index.dimension(), 3);

    // Row i holds the vector of sequence entry i.
    assert_eq!(index.row(0).unwrap(), &[0.0, 1.0, 0.0]);
    assert_eq!(index.row(1).unwrap(), &[0.0, 0.0, 1.0]);
    assert_eq!(index.row(2).unwrap(), &[1.0, 0.0, 0.0]);

    let entry = ledger.embedded_files[TOKYO.0];
    assert_eq!(entry.embedding_dim, 3);
    assert_eq!(entry.input_token_count, 5);
}

#[tokio::test]
async fn test_second_sync_is_idempotent() {
    let store = seeded_store();
    let embedder = Arc::new(StubEmbedder::sample());
    let sync = synchronizer(&store, &embedder);

    sync.sync(&sync_params()).await.unwrap();
    let puts = store.put_count();
    let calls = embedder.calls();
    let index_before = store.object(BUCKET, INDEX_KEY);

    let outcome = sync.sync(&sync_params()).await.unwrap();

    assert_eq!(outcome.num_new_embeddings, Some(0));
    assert_eq!(outcome.message, NOTHING_NEW_MESSAGE);
    assert_eq!(store.put_count(), puts);
    assert_eq!(embedder.calls(), calls);
    assert_eq!(store.object(BUCKET, INDEX_KEY), index_before);
}

#[tokio::test]
async fn test_deletion_prunes_ledger_but_keeps_index_rows() {
    let store = seeded_store();
    let embedder = Arc::new(StubEmbedder::sample());
    let sync = synchronizer(&store, &embedder);
    sync.sync(&sync_params()).await.unwrap();

    store.remove(BUCKET, PARIS.0);
    store.insert(BUCKET, "docs/kyoto.txt", "Kyoto was the old capital.");
    embedder.set("Kyoto was the old capital.", vec![0.8, 0.0, 0.1]);

    let outcome = sync.sync(&sync_params()).await.unwrap();
    assert_eq!(outcome.num_new_embeddings, Some(1));
    assert_eq!(outcome.num_pruned, Some(1));

    let (ledger, index) = load_state(&store).await;
    assert!(!ledger.contains(PARIS.0));
    assert!(ledger.contains("docs/kyoto.txt"));
    assert_eq!(index.len(), 4);
    assert_eq!(ledger.embedded_files_sequence.len(), 3);

    let drift = ledger.check_consistency(index.len());
    assert_eq!(drift.unreferenced_rows, 1);
    assert!(drift.keys_missing_from_sequence.is_empty());
}

#[tokio::test]
async fn test_pruning_alone_writes_nothing() {
    let store = seeded_store();
    let embedder = Arc::new(StubEmbedder::sample());
    let sync = synchronizer(&store, &embedder);
    sync.sync(&sync_params()).await.unwrap();
    let puts = store.put_count();

    store.remove(BUCKET, RUST.0);
    let outcome = sync.sync(&sync_params()).await.unwrap();

    assert_eq!(outcome.num_new_embeddings, Some(0));
    assert_eq!(outcome.num_pruned, Some(1));
    assert_eq!(store.put_count(), puts);
}

#[tokio::test]
async fn test_empty_namespace_reports_no_files() {
    let store = Arc::new(MemoryStore::new());
    store.insert(BUCKET, PREFIX, Vec::new());
    let embedder = Arc::new(StubEmbedder::sample());

    let outcome = synchronizer(&store, &embedder)
        .sync(&sync_params())
        .await
        .unwrap();

    assert_eq!(outcome.message, "No files found under corpus/docs/");
    assert_eq!(outcome.num_new_embeddings, None);
    assert_eq!(store.put_count(), 0);
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_embed_failure_skips_document_until_next_run() {
    let store = seeded_store();
    let embedder = Arc::new(StubEmbedder::sample());
    embedder.fail_on(RUST.1);
    let sync = synchronizer(&store, &embedder);

    let outcome = sync.sync(&sync_params()).await.unwrap();
    assert_eq!(outcome.num_new_embeddings, Some(2));
    let (ledger, index) = load_state(&store).await;
    assert_consistent(&ledger, &index);
    assert!(!ledger.contains(RUST.0));

    embedder.recover(RUST.1);
    let outcome = sync.sync(&sync_params()).await.unwrap();
    assert_eq!(outcome.num_new_embeddings, Some(1));

    let (ledger, index) = load_state(&store).await;
    assert_consistent(&ledger, &index);
    assert_eq!(ledger.len(), 3);
    assert_eq!(ledger.embedded_files_sequence.last().map(String::as_str), Some(RUST.0));
}

#[tokio::test]
async fn test_read_failure_skips_document() {
    let store = seeded_store();
    store.fail_get(PARIS.0);
    let embedder = Arc::new(StubEmbedder::sample());

    let outcome = synchronizer(&store, &embedder)
        .sync(&sync_params())
        .await
        .unwrap();

    assert_eq!(outcome.num_new_embeddings, Some(2));
    let ledger = Ledger::load(store.as_ref(), BUCKET, METADATA_KEY).await.unwrap();
    assert!(!ledger.contains(PARIS.0));
}

#[tokio::test]
async fn test_all_embeddings_failing_writes_nothing() {
    let store = seeded_store();
    let embedder = Arc::new(StubEmbedder::new());

    let outcome = synchronizer(&store, &embedder)
        .sync(&sync_params())
        .await
        .unwrap();

    assert_eq!(outcome.num_new_embeddings, Some(0));
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn test_listing_failure_is_fatal() {
    let store = seeded_store();
    store.fail_list(true);
    let embedder = Arc::new(StubEmbedder::sample());

    let err = synchronizer(&store, &embedder)
        .sync(&sync_params())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Store(_)));
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_index_upload_failure_skips_ledger_write() {
    let store = seeded_store();
    store.fail_put(INDEX_KEY);
    let embedder = Arc::new(StubEmbedder::sample());

    let err = synchronizer(&store, &embedder)
        .sync(&sync_params())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Index(_)));
    assert_eq!(err.status_code(), 500);
    assert!(store.object(BUCKET, METADATA_KEY).is_none());
}

#[tokio::test]
async fn test_index_load_failure_is_fatal() {
    let store = seeded_store();
    let embedder = Arc::new(StubEmbedder::sample());
    let sync = synchronizer(&store, &embedder);
    sync.sync(&sync_params()).await.unwrap();

    store.insert(BUCKET, "docs/kyoto.txt", "Kyoto was the old capital.");
    embedder.set("Kyoto was the old capital.", vec![0.8, 0.0, 0.1]);
    store.fail_get(INDEX_KEY);
    let ledger_before = store.object(BUCKET, METADATA_KEY);
    let index_before = store.object(BUCKET, INDEX_KEY);
    let puts = store.put_count();

    // An unreadable index must not be replaced by a fresh one.
    let err = sync.sync(&sync_params()).await.unwrap_err();

    assert!(matches!(err, AppError::Index(_)));
    assert_eq!(err.status_code(), 500);
    assert_eq!(store.put_count(), puts);
    assert_eq!(store.object(BUCKET, METADATA_KEY), ledger_before);
    assert_eq!(store.object(BUCKET, INDEX_KEY), index_before);
}

#[tokio::test]
async fn test_ledger_save_failure_leaves_unreferenced_rows() {
    let store = seeded_store();
    let embedder = Arc::new(StubEmbedder::sample());
    let sync = synchronizer(&store, &embedder);
    sync.sync(&sync_params()).await.unwrap();

    store.insert(BUCKET, "docs/kyoto.txt", "Kyoto was the old capital.");
    embedder.set("Kyoto was the old capital.", vec![0.8, 0.0, 0.1]);
    store.fail_put(METADATA_KEY);

    let err = sync.sync(&sync_params()).await.unwrap_err();
    assert!(matches!(err, AppError::Ledger(_)));

    let (ledger, index) = load_state(&store).await;
    assert_eq!(index.len(), 4);
    assert_eq!(ledger.embedded_files_sequence.len(), 3);
    assert_eq!(ledger.check_consistency(index.len()).unreferenced_rows, 1);

    // The next run retries the document and appends after the stale row.
    store.clear_failures();
    let outcome = sync.sync(&sync_params()).await.unwrap();
    assert_eq!(outcome.num_new_embeddings, Some(1));
    let (ledger, index) = load_state(&store).await;
    assert_eq!(index.len(), 5);
    assert_eq!(ledger.embedded_files_sequence.len(), 4);
}

#[tokio::test]
async fn test_dimension_mismatch_fails_before_any_write() {
    let store = seeded_store();
    FlatL2Index::new(4)
        .unwrap()
        .save(store.as_ref(), BUCKET, INDEX_KEY)
        .await
        .unwrap();
    let puts = store.put_count();
    let embedder = Arc::new(StubEmbedder::sample());

    let err = synchronizer(&store, &embedder)
        .sync(&sync_params())
        .await
        .unwrap_err();

    assert!(err
        .to_string()
        .contains("Dimension mismatch! Existing index dim=4, new embeddings=3."));
    assert_eq!(store.put_count(), puts);
    assert!(store.object(BUCKET, METADATA_KEY).is_none());
}

#[tokio::test]
async fn test_corrupt_ledger_is_fatal() {
    let store = seeded_store();
    store.insert(BUCKET, METADATA_KEY, "{not json");
    let embedder = Arc::new(StubEmbedder::sample());

    let err = synchronizer(&store, &embedder)
        .sync(&sync_params())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Ledger(_)));
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn test_index_and_ledger_blobs_are_not_documents() {
    let store = seeded_store();
    let embedder = Arc::new(StubEmbedder::sample());
    let mut params = sync_params();
    params.corpus_prefix = String::new();
    params.index_key = "docs/vectors.bin".to_string();
    params.metadata_key = "docs/ledger.json".to_string();
    let sync = synchronizer(&store, &embedder);

    sync.sync(&params).await.unwrap();
    let outcome = sync.sync(&params).await.unwrap();

    assert_eq!(outcome.num_new_embeddings, Some(0));
    assert_eq!(outcome.num_pruned, Some(0));
    let keys = store.list(BUCKET, "").await.unwrap();
    assert!(keys.contains(&"docs/vectors.bin".to_string()));
}
