//! Incremental index synchronization.
//!
//! A run diffs the listed corpus against the ledger, embeds only documents
//! the ledger does not know, appends them to the vector index and writes the
//! index first and the ledger second. There is no transaction across the two
//! writes: a failure after the index upload leaves rows the ledger does not
//! reference, which queries tolerate by dropping out-of-range rows.
//!
//! Concurrent runs against the same namespace race: both load the same base
//! index and the later upload wins. Callers must serialize runs per namespace.

use crate::embeddings::{Embedding, EmbeddingProvider};
use crate::flat_index::FlatL2Index;
use crate::ledger::{EmbeddingMetadataEntry, Ledger};
use crate::request::{SyncOutcome, SyncParams};
use crate::store::{is_directory_marker, location, DocumentStore};
use crate::vector_index::VectorIndex;
use futures::stream::{self, StreamExt};
use ragsync_core::AppResult;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Reported when a run produced no embeddings.
pub const NOTHING_NEW_MESSAGE: &str =
    "No new embeddings were generated; everything is already embedded or no new files.";

/// Brings a namespace's ledger and vector index up to date with the store.
pub struct IndexSynchronizer {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    concurrency: usize,
}

impl IndexSynchronizer {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            concurrency: 1,
        }
    }

    /// Number of embedding calls kept in flight at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn sync(&self, params: &SyncParams) -> AppResult<SyncOutcome> {
        let start = Instant::now();
        let bucket = params.corpus_bucket.as_str();

        tracing::info!(
            store = self.store.store_name(),
            embedder = self.embedder.provider_name(),
            model = self.embedder.model_name(),
            region = %params.embedding_region,
            "Synchronizing {}",
            location(bucket, &params.corpus_prefix)
        );

        let listed = self.list_documents(params).await?;
        if listed.is_empty() {
            let msg = format!(
                "No files found under {}",
                location(bucket, &params.corpus_prefix)
            );
            tracing::info!("{}", msg);
            return Ok(SyncOutcome::message_only(msg));
        }

        let mut ledger = Ledger::load(self.store.as_ref(), bucket, &params.metadata_key).await?;

        let listed_set: HashSet<&str> = listed.iter().map(String::as_str).collect();
        let pruned = ledger.prune(&listed_set);
        if !pruned.is_empty() {
            tracing::info!(count = pruned.len(), "Pruned ledger entries: {:?}", pruned);
        }

        let new_keys: Vec<&str> = listed
            .iter()
            .map(String::as_str)
            .filter(|key| !ledger.contains(key))
            .collect();
        tracing::info!(
            listed = listed.len(),
            new = new_keys.len(),
            "Found {} documents not yet embedded",
            new_keys.len()
        );

        let embedded = self.embed_documents(bucket, &new_keys).await;
        if embedded.is_empty() {
            tracing::info!("{}", NOTHING_NEW_MESSAGE);
            return Ok(SyncOutcome {
                message: NOTHING_NEW_MESSAGE.to_string(),
                index_key: None,
                metadata_key: None,
                num_new_embeddings: Some(0),
                num_pruned: Some(pruned.len()),
            });
        }

        let batch: Vec<Vec<f32>> = embedded.iter().map(|(_, e)| e.vector.clone()).collect();
        let mut index = self
            .load_or_create_index(bucket, &params.index_key, &batch[0])
            .await?;

        // Rejects a dimension change before anything is written.
        index.add(&batch)?;
        index
            .save(self.store.as_ref(), bucket, &params.index_key)
            .await?;

        for (key, embedding) in &embedded {
            ledger.record(
                key.as_str(),
                EmbeddingMetadataEntry {
                    input_token_count: embedding.input_token_count,
                    embedding_dim: embedding.dimension(),
                },
            );
        }
        ledger
            .save(self.store.as_ref(), bucket, &params.metadata_key)
            .await?;

        let drift = ledger.check_consistency(index.len());
        if !drift.is_consistent() {
            tracing::warn!(
                unreferenced_rows = drift.unreferenced_rows,
                dangling_sequence_entries = drift.dangling_sequence_entries,
                "Ledger and vector index disagree after sync"
            );
        }

        tracing::info!(
            new = embedded.len(),
            pruned = pruned.len(),
            rows = index.len(),
            "Sync completed in {:.2}s",
            start.elapsed().as_secs_f64()
        );

        Ok(SyncOutcome {
            message: format!(
                "Successfully embedded {} new files and updated vector index.",
                embedded.len()
            ),
            index_key: Some(params.index_key.clone()),
            metadata_key: Some(params.metadata_key.clone()),
            num_new_embeddings: Some(embedded.len()),
            num_pruned: Some(pruned.len()),
        })
    }

    /// Listed document keys, without directory markers or the index and
    /// ledger blobs themselves.
    async fn list_documents(&self, params: &SyncParams) -> AppResult<Vec<String>> {
        let bucket = params.corpus_bucket.as_str();
        let keys = self
            .store
            .list(bucket, &params.corpus_prefix)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Error listing {}: {}",
                    location(bucket, &params.corpus_prefix),
                    e
                );
                e
            })?;
        Ok(keys
            .into_iter()
            .filter(|key| {
                !is_directory_marker(key) && *key != params.index_key && *key != params.metadata_key
            })
            .collect())
    }

    /// Read and embed each document, keeping listing order.
    ///
    /// Failures are logged and the document is left out; it stays eligible
    /// for the next run.
    async fn embed_documents(&self, bucket: &str, keys: &[&str]) -> Vec<(String, Embedding)> {
        let results: Vec<Option<(String, Embedding)>> = stream::iter(keys.iter().copied())
            .map(|key| async move {
                match self.embed_document(bucket, key).await {
                    Ok(embedding) => Some((key.to_string(), embedding)),
                    Err(e) => {
                        tracing::error!(key, "Skipping document: {}", e);
                        None
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        results.into_iter().flatten().collect()
    }

    async fn embed_document(&self, bucket: &str, key: &str) -> AppResult<Embedding> {
        let text = self.store.read_text(bucket, key).await?;
        let embedding = self.embedder.embed(&text).await?;
        tracing::debug!(
            tokens = embedding.input_token_count,
            dim = embedding.dimension(),
            "Embedded {}",
            key
        );
        Ok(embedding)
    }

    async fn load_or_create_index(
        &self,
        bucket: &str,
        key: &str,
        first: &[f32],
    ) -> AppResult<FlatL2Index> {
        match FlatL2Index::load(self.store.as_ref(), bucket, key).await {
            Ok(index) => Ok(index),
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    dimension = first.len(),
                    "No index at {}, creating a new one",
                    location(bucket, key)
                );
                FlatL2Index::new(first.len())
            }
            Err(e) => Err(e),
        }
    }
}
