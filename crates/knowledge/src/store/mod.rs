//! Document store adapters.
//!
//! The synchronizer and the query engine only talk to [`DocumentStore`]: list
//! keys under a prefix, read a blob, write a blob. Absence is always reported
//! as [`AppError::NotFound`] so callers can tell "not there yet" apart from a
//! real failure.

pub mod fs;
pub mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use ragsync_core::{AppError, AppResult};

/// Separator used inside keys; a key ending with it is a directory marker.
pub const KEY_SEPARATOR: char = '/';

/// Trait for object store backends.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name for logging (e.g., "fs", "memory").
    fn store_name(&self) -> &str;

    /// List every key in `bucket` starting with `prefix`, in lexicographic order.
    ///
    /// Directory markers are included; use [`is_directory_marker`] to skip them.
    async fn list(&self, bucket: &str, prefix: &str) -> AppResult<Vec<String>>;

    /// Read a blob. Returns `AppError::NotFound` when the key does not exist.
    async fn get(&self, bucket: &str, key: &str) -> AppResult<Vec<u8>>;

    /// Write a blob, replacing any previous content.
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> AppResult<()>;

    /// Read a blob and decode it as UTF-8 text.
    async fn read_text(&self, bucket: &str, key: &str) -> AppResult<String> {
        let bytes = self.get(bucket, key).await?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Store(format!("{} is not valid UTF-8: {}", key, e)))
    }
}

/// Whether a listed key is a folder placeholder rather than a document.
pub fn is_directory_marker(key: &str) -> bool {
    key.ends_with(KEY_SEPARATOR)
}

/// Human-readable location of a key, used in log and response messages.
pub fn location(bucket: &str, key: &str) -> String {
    format!("{}{}{}", bucket, KEY_SEPARATOR, key)
}
