//! Incremental RAG index synchronization and retrieval.
//!
//! Two structures are persisted per namespace in a [`store::DocumentStore`]:
//! an append-only vector index ([`flat_index::FlatL2Index`]) and a JSON
//! [`ledger::Ledger`] whose sequence maps index rows to document keys.
//!
//! - [`sync::IndexSynchronizer`] embeds documents the ledger does not know
//!   yet and prunes entries for documents that disappeared.
//! - [`query::QueryEngine`] embeds a query, finds the nearest rows, resolves
//!   them to documents and asks a generation provider for an answer.
//! - [`handler`] wraps both behind request/response types with status codes.

pub mod embeddings;
pub mod flat_index;
pub mod handler;
pub mod ledger;
pub mod prompt;
pub mod query;
pub mod request;
pub mod stats;
pub mod store;
pub mod sync;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use embeddings::{create_provider, Embedding, EmbeddingProvider};
pub use flat_index::FlatL2Index;
pub use handler::{handle_query, handle_stats, handle_sync, parse_request, Services, StatsResponse};
pub use ledger::{EmbeddingMetadataEntry, Ledger, LedgerDrift};
pub use query::{QueryAnswer, QueryEngine, RetrievedDocument};
pub use request::{
    QueryOutcome, QueryParams, QueryRequest, QueryResponse, Response, ResponseBody, StatsParams,
    StatsRequest, SyncOutcome, SyncParams, SyncRequest, SyncResponse,
};
pub use stats::{collect_stats, IndexStats};
pub use store::{DocumentStore, FsStore, MemoryStore};
pub use sync::IndexSynchronizer;
pub use vector_index::{SearchHit, VectorIndex};
