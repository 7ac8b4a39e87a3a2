//! Vector index abstraction.
//!
//! An index holds fixed-dimension vectors in insertion order and answers
//! nearest-neighbor queries with row positions. It stores no identities;
//! the ledger maps rows back to documents.

use ragsync_core::AppResult;
use serde::Serialize;

/// One search result: a row position and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchHit {
    pub row: usize,
    pub distance: f32,
}

/// Trait for append-only vector index backends.
///
/// Implementations must:
/// - keep a fixed dimension chosen at creation
/// - append batches in order, never reordering or removing rows
/// - return hits sorted by ascending distance
pub trait VectorIndex: Send + Sync {
    /// Dimension every stored vector has.
    fn dimension(&self) -> usize;

    /// Number of stored rows.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a batch; rows keep the batch order.
    ///
    /// Fails without modifying the index if any vector has the wrong dimension.
    fn add(&mut self, batch: &[Vec<f32>]) -> AppResult<()>;

    /// Up to `k` nearest rows to `query`, nearest first.
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchHit>>;
}
