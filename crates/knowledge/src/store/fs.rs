//! Filesystem-backed object store.
//!
//! A bucket is a directory under the store root and a key is a
//! `/`-separated path relative to it. Sub-directories are listed as
//! directory markers (`docs/`), mirroring how object stores surface folders.

use super::{location, DocumentStore, KEY_SEPARATOR};
use ragsync_core::{AppError, AppResult};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Prefix of in-flight upload files; never listed.
const TEMP_PREFIX: &str = ".ragsync-tmp-";

/// Directory-backed [`DocumentStore`].
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> AppResult<PathBuf> {
        if bucket.is_empty() || bucket.contains(KEY_SEPARATOR) || bucket == "." || bucket == ".." {
            return Err(AppError::Config(format!("Invalid bucket name: '{}'", bucket)));
        }
        Ok(self.root.join(bucket))
    }

    /// Map a key to a path inside the bucket, rejecting escapes.
    fn object_path(&self, bucket: &str, key: &str) -> AppResult<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(AppError::Config(format!("Invalid object key: '{}'", key)));
        }
        Ok(self.bucket_dir(bucket)?.join(relative))
    }
}

fn key_for(bucket_dir: &Path, path: &Path, is_dir: bool) -> Option<String> {
    let relative = path.strip_prefix(bucket_dir).ok()?;
    let mut key = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if key.is_empty() {
        return None;
    }
    if is_dir {
        key.push(KEY_SEPARATOR);
    }
    Some(key)
}

/// Every key under `bucket_dir` starting with `prefix`, sorted.
fn walk_keys(bucket_dir: &Path, bucket: &str, prefix: &str) -> AppResult<Vec<String>> {
    let mut keys = Vec::new();
    for entry in WalkDir::new(bucket_dir).follow_links(false) {
        let entry = entry.map_err(|e| {
            AppError::Store(format!("Failed to list {}: {}", location(bucket, prefix), e))
        })?;

        if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
            continue;
        }

        if let Some(key) = key_for(bucket_dir, entry.path(), entry.file_type().is_dir()) {
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
    }

    keys.sort();
    Ok(keys)
}

#[async_trait::async_trait]
impl DocumentStore for FsStore {
    fn store_name(&self) -> &str {
        "fs"
    }

    async fn list(&self, bucket: &str, prefix: &str) -> AppResult<Vec<String>> {
        let bucket_dir = self.bucket_dir(bucket)?;
        let is_dir = tokio::fs::metadata(&bucket_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(AppError::NotFound(format!("Bucket '{}' does not exist", bucket)));
        }

        // walkdir is blocking; keep it off the async worker threads.
        let (bucket_name, key_prefix) = (bucket.to_string(), prefix.to_string());
        let keys = tokio::task::spawn_blocking(move || {
            walk_keys(&bucket_dir, &bucket_name, &key_prefix)
        })
        .await
        .map_err(|e| {
            AppError::Store(format!("Listing {} aborted: {}", location(bucket, prefix), e))
        })??;

        tracing::debug!(bucket, prefix, count = keys.len(), "Listed keys");
        Ok(keys)
    }

    async fn get(&self, bucket: &str, key: &str) -> AppResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(AppError::NotFound(location(bucket, key)))
            }
            Err(e) => Err(AppError::Store(format!(
                "Failed to read {}: {}",
                location(bucket, key),
                e
            ))),
        }
    }

    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> AppResult<()> {
        let path = self.object_path(bucket, key)?;
        let parent = path
            .parent()
            .ok_or_else(|| AppError::Config(format!("Invalid object key: '{}'", key)))?;

        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            AppError::Store(format!("Failed to create {:?}: {}", parent, e))
        })?;

        // Write then rename so readers never see a partial blob.
        let temp = parent.join(format!("{}{}", TEMP_PREFIX, uuid::Uuid::new_v4()));
        tokio::fs::write(&temp, &bytes).await.map_err(|e| {
            AppError::Store(format!("Failed to write {}: {}", location(bucket, key), e))
        })?;
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(AppError::Store(format!(
                "Failed to write {}: {}",
                location(bucket, key),
                e
            )));
        }

        tracing::debug!(bucket, key, bytes = bytes.len(), "Wrote object");
        Ok(())
    }
}
