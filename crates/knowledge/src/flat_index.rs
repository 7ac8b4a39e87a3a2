//! Exhaustive L2 vector index with a compact binary format.
//!
//! Blob layout (little-endian):
//!
//! | bytes | field |
//! |---|---|
//! | 4 | magic `RSVI` |
//! | 4 | format version (u32) |
//! | 4 | dimension (u32) |
//! | 8 | row count (u64) |
//! | rows * dim * 4 | row-major f32 values |

use crate::store::{location, DocumentStore};
use crate::vector_index::{SearchHit, VectorIndex};
use ragsync_core::{AppError, AppResult};

const MAGIC: &[u8; 4] = b"RSVI";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Flat index: every search scans all rows.
///
/// Distances are squared Euclidean distances. Equal distances keep row order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    /// Create an empty index; the dimension can never change afterwards.
    pub fn new(dimension: usize) -> AppResult<Self> {
        if dimension == 0 || dimension > u32::MAX as usize {
            return Err(AppError::Index(format!(
                "Invalid index dimension: {}",
                dimension
            )));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    /// Stored vector at `row`.
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Serialize to the binary blob format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for value in &self.data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// Parse the binary blob format, validating header and length.
    pub fn from_bytes(bytes: &[u8]) -> AppResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(AppError::Index(format!(
                "Index blob too short: {} bytes",
                bytes.len()
            )));
        }
        if &bytes[0..4] != MAGIC {
            return Err(AppError::Index("Index blob has wrong magic".to_string()));
        }

        let version = read_u32(&bytes[4..8]);
        if version != FORMAT_VERSION {
            return Err(AppError::Index(format!(
                "Unsupported index format version {}",
                version
            )));
        }

        let dimension = read_u32(&bytes[8..12]) as usize;
        let rows = read_u64(&bytes[12..20]);
        let mut index = Self::new(dimension)?;

        let expected = (rows as usize)
            .checked_mul(dimension)
            .and_then(|values| values.checked_mul(4))
            .ok_or_else(|| AppError::Index("Index blob header overflows".to_string()))?;
        let payload = &bytes[HEADER_LEN..];
        if payload.len() != expected {
            return Err(AppError::Index(format!(
                "Index blob holds {} payload bytes, header declares {} rows x {} dims",
                payload.len(),
                rows,
                dimension
            )));
        }

        index.data = payload
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(index)
    }

    /// Load an index blob from the store.
    ///
    /// Absence is passed through as `AppError::NotFound`; any other failure
    /// is reported as an index error.
    pub async fn load(store: &dyn DocumentStore, bucket: &str, key: &str) -> AppResult<Self> {
        let bytes = store.get(bucket, key).await.map_err(|e| {
            if e.is_not_found() {
                AppError::NotFound(format!("Vector index not found at {}", location(bucket, key)))
            } else {
                AppError::Index(format!(
                    "Error loading vector index from {}: {}",
                    location(bucket, key),
                    e
                ))
            }
        })?;

        let index = Self::from_bytes(&bytes)?;
        tracing::info!(
            rows = index.len(),
            dimension = index.dimension,
            "Loaded vector index from {}",
            location(bucket, key)
        );
        Ok(index)
    }

    /// Upload the index blob to the store.
    pub async fn save(&self, store: &dyn DocumentStore, bucket: &str, key: &str) -> AppResult<()> {
        store
            .put(bucket, key, self.to_bytes())
            .await
            .map_err(|e| {
                AppError::Index(format!(
                    "Error uploading vector index to {}: {}",
                    location(bucket, key),
                    e
                ))
            })?;
        tracing::info!(rows = self.len(), "Uploaded vector index to {}", location(bucket, key));
        Ok(())
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl VectorIndex for FlatL2Index {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    fn add(&mut self, batch: &[Vec<f32>]) -> AppResult<()> {
        if let Some(bad) = batch.iter().find(|v| v.len() != self.dimension) {
            return Err(AppError::Index(format!(
                "Dimension mismatch! Existing index dim={}, new embeddings={}.",
                self.dimension,
                bad.len()
            )));
        }

        self.data.reserve(batch.len() * self.dimension);
        for vector in batch {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(AppError::Index(format!(
                "Query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }

        let mut hits: Vec<SearchHit> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, vector)| SearchHit {
                row,
                distance: squared_l2(query, vector),
            })
            .collect();

        // Stable sort keeps scan order among equal distances; NaN gets a fixed place.
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }
}
