//! ragsync core library
//!
//! Foundational utilities shared by the ragsync crates:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, EmbeddingSettings, GenerationSettings};
pub use error::{AppError, AppResult};
