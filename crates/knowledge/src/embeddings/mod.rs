//! Embedding capability.
//!
//! Text goes in, a fixed-dimension vector plus the provider's input token
//! count comes out. Which model produces it is decided by configuration.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, Embedding, EmbeddingProvider};
