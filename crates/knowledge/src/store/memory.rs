//! In-process object store.
//!
//! Backs tests and embedders that keep their corpus in memory. Individual
//! operations can be made to fail so every branch of the error handling can
//! be exercised without a real backend.

use super::{location, DocumentStore};
use ragsync_core::{AppError, AppResult};
use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Inner {
    buckets: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    fail_list: bool,
    failing_gets: HashSet<String>,
    failing_puts: HashSet<String>,
    puts: usize,
}

/// Map-backed [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed or overwrite an object without counting it as a write.
    pub fn insert(&self, bucket: &str, key: &str, bytes: impl Into<Vec<u8>>) {
        self.write()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), bytes.into());
    }

    /// Remove an object; returns whether it existed.
    pub fn remove(&self, bucket: &str, key: &str) -> bool {
        self.write()
            .buckets
            .get_mut(bucket)
            .map(|objects| objects.remove(key).is_some())
            .unwrap_or(false)
    }

    /// Raw content of an object, if present.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.read()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key).cloned())
    }

    /// Number of successful `put` calls since creation.
    pub fn put_count(&self) -> usize {
        self.read().puts
    }

    /// Make every `list` call fail.
    pub fn fail_list(&self, fail: bool) {
        self.write().fail_list = fail;
    }

    /// Make `get` fail for `key` with a non-not-found error.
    pub fn fail_get(&self, key: &str) {
        self.write().failing_gets.insert(key.to_string());
    }

    /// Make `put` fail for `key`.
    pub fn fail_put(&self, key: &str) {
        self.write().failing_puts.insert(key.to_string());
    }

    /// Clear all injected failures.
    pub fn clear_failures(&self) {
        let mut inner = self.write();
        inner.fail_list = false;
        inner.failing_gets.clear();
        inner.failing_puts.clear();
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    fn store_name(&self) -> &str {
        "memory"
    }

    async fn list(&self, bucket: &str, prefix: &str) -> AppResult<Vec<String>> {
        let inner = self.read();
        if inner.fail_list {
            return Err(AppError::Store(format!(
                "Listing {} failed",
                location(bucket, prefix)
            )));
        }

        Ok(inner
            .buckets
            .get(bucket)
            .map(|objects| {
                objects
                    .keys()
                    .filter(|key| key.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, bucket: &str, key: &str) -> AppResult<Vec<u8>> {
        let inner = self.read();
        if inner.failing_gets.contains(key) {
            return Err(AppError::Store(format!(
                "Access denied reading {}",
                location(bucket, key)
            )));
        }

        inner
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key).cloned())
            .ok_or_else(|| AppError::NotFound(location(bucket, key)))
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> AppResult<()> {
        let mut inner = self.write();
        if inner.failing_puts.contains(key) {
            return Err(AppError::Store(format!(
                "Upload to {} failed",
                location(bucket, key)
            )));
        }

        inner
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), bytes);
        inner.puts += 1;
        Ok(())
    }
}
