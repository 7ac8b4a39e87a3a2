//! Read-only health report for a namespace.

use crate::flat_index::FlatL2Index;
use crate::ledger::{Ledger, LedgerDrift};
use crate::request::StatsParams;
use crate::store::DocumentStore;
use crate::vector_index::VectorIndex;
use ragsync_core::AppResult;
use serde::Serialize;

/// Counts and drift for one ledger/index pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub ledger_entries: usize,
    pub sequence_len: usize,

    /// `None` when no index has been written yet
    pub index_rows: Option<usize>,
    pub dimension: Option<usize>,

    pub consistent: bool,
    pub drift: LedgerDrift,
}

/// Load both structures and compare them. Writes nothing.
pub async fn collect_stats(store: &dyn DocumentStore, params: &StatsParams) -> AppResult<IndexStats> {
    let ledger = Ledger::load(store, &params.corpus_bucket, &params.metadata_key).await?;

    let index = match FlatL2Index::load(store, &params.corpus_bucket, &params.index_key).await {
        Ok(index) => Some(index),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e),
    };

    let row_count = index.as_ref().map(|i| i.len()).unwrap_or(0);
    let drift = ledger.check_consistency(row_count);

    Ok(IndexStats {
        ledger_entries: ledger.len(),
        sequence_len: ledger.embedded_files_sequence.len(),
        index_rows: index.as_ref().map(|i| i.len()),
        dimension: index.as_ref().map(|i| i.dimension()),
        consistent: drift.is_consistent(),
        drift,
    })
}
