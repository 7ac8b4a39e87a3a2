//! Metadata ledger.
//!
//! The ledger records which documents are embedded and, through
//! `embedded_files_sequence`, which vector-index row belongs to which
//! document: position `i` of the sequence is row `i` of the index. The index
//! itself stores no identities, so this sequence is the only way back from a
//! search hit to a document.
//!
//! Persisted as JSON:
//! ```json
//! {"version": 1,
//!  "embedded_files": {"docs/a.txt": {"input_token_count": 12, "embedding_dim": 1024}},
//!  "embedded_files_sequence": ["docs/a.txt"]}
//! ```

use crate::store::{location, DocumentStore};
use ragsync_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Current ledger format version.
pub const LEDGER_VERSION: u32 = 1;

/// Bookkeeping for one embedded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingMetadataEntry {
    pub input_token_count: u32,
    pub embedding_dim: usize,
}

/// Persisted record of embedded documents and their index row order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub embedded_files: BTreeMap<String, EmbeddingMetadataEntry>,

    #[serde(default)]
    pub embedded_files_sequence: Vec<String>,
}

fn default_version() -> u32 {
    LEDGER_VERSION
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            version: LEDGER_VERSION,
            embedded_files: BTreeMap::new(),
            embedded_files_sequence: Vec::new(),
        }
    }
}

/// Disagreement between the ledger and the vector index.
///
/// Drift appears after a crash between the index upload and the ledger save,
/// or after documents were pruned (pruning never removes index rows).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerDrift {
    /// Index rows with no sequence entry
    pub unreferenced_rows: usize,

    /// Sequence entries pointing past the end of the index
    pub dangling_sequence_entries: usize,

    /// Keys in `embedded_files` missing from the sequence
    pub keys_missing_from_sequence: Vec<String>,

    /// Sequence entries missing from `embedded_files`
    pub sequence_entries_missing_from_keys: Vec<String>,
}

impl LedgerDrift {
    pub fn is_consistent(&self) -> bool {
        self.unreferenced_rows == 0
            && self.dangling_sequence_entries == 0
            && self.keys_missing_from_sequence.is_empty()
            && self.sequence_entries_missing_from_keys.is_empty()
    }
}

impl Ledger {
    /// Load the ledger blob; a missing blob yields an empty ledger.
    pub async fn load(store: &dyn DocumentStore, bucket: &str, key: &str) -> AppResult<Self> {
        match store.get(bucket, key).await {
            Ok(bytes) => {
                let ledger: Ledger = serde_json::from_slice(&bytes).map_err(|e| {
                    AppError::Ledger(format!(
                        "Failed to parse ledger at {}: {}",
                        location(bucket, key),
                        e
                    ))
                })?;
                tracing::info!(
                    entries = ledger.embedded_files.len(),
                    rows = ledger.embedded_files_sequence.len(),
                    "Loaded ledger from {}",
                    location(bucket, key)
                );
                Ok(ledger)
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    "No existing ledger at {}, starting empty",
                    location(bucket, key)
                );
                Ok(Self::default())
            }
            Err(e) => Err(AppError::Ledger(format!(
                "Failed to load ledger from {}: {}",
                location(bucket, key),
                e
            ))),
        }
    }

    /// Persist the ledger as pretty-printed JSON.
    pub async fn save(&self, store: &dyn DocumentStore, bucket: &str, key: &str) -> AppResult<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        store.put(bucket, key, bytes).await.map_err(|e| {
            AppError::Ledger(format!(
                "Failed to save ledger to {}: {}",
                location(bucket, key),
                e
            ))
        })?;
        tracing::info!("Saved ledger to {}", location(bucket, key));
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.embedded_files.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.embedded_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embedded_files.is_empty()
    }

    /// Drop every entry whose document is no longer listed.
    ///
    /// Removes the keys from both the map and the sequence and returns them
    /// in sorted order. The vector index is not touched, so later rows shift
    /// relative to their vectors until the index is rebuilt.
    pub fn prune(&mut self, listed: &HashSet<&str>) -> Vec<String> {
        let removed: Vec<String> = self
            .embedded_files
            .keys()
            .filter(|key| !listed.contains(key.as_str()))
            .cloned()
            .collect();

        if removed.is_empty() {
            return removed;
        }

        for key in &removed {
            self.embedded_files.remove(key);
        }
        let removed_set: HashSet<&str> = removed.iter().map(String::as_str).collect();
        self.embedded_files_sequence
            .retain(|key| !removed_set.contains(key.as_str()));

        removed
    }

    /// Record a newly embedded document at the next sequence position.
    pub fn record(&mut self, key: impl Into<String>, entry: EmbeddingMetadataEntry) {
        let key = key.into();
        self.embedded_files.insert(key.clone(), entry);
        self.embedded_files_sequence.push(key);
    }

    /// Document identity stored at an index row, if the row is mapped.
    pub fn resolve(&self, row: usize) -> Option<&str> {
        self.embedded_files_sequence.get(row).map(String::as_str)
    }

    /// Compare the ledger against an index with `row_count` rows.
    pub fn check_consistency(&self, row_count: usize) -> LedgerDrift {
        let sequence_len = self.embedded_files_sequence.len();
        let keys: BTreeSet<&str> = self.embedded_files.keys().map(String::as_str).collect();
        let sequence: BTreeSet<&str> = self
            .embedded_files_sequence
            .iter()
            .map(String::as_str)
            .collect();

        LedgerDrift {
            unreferenced_rows: row_count.saturating_sub(sequence_len),
            dangling_sequence_entries: sequence_len.saturating_sub(row_count),
            keys_missing_from_sequence: keys
                .difference(&sequence)
                .map(|k| k.to_string())
                .collect(),
            sequence_entries_missing_from_keys: sequence
                .difference(&keys)
                .map(|k| k.to_string())
                .collect(),
        }
    }
}
