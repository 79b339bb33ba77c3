//! Append-only in-memory index with exact L2 nearest-neighbor search.
//!
//! Stores one fingerprint per analyzed URL. IDs are assigned by the index:
//! - first entry is 0, each insertion adds 1
//! - never reused, never reassigned
//!
//! Entries sit behind a `RwLock`. `add` holds the write lock while it reads
//! the next ID and appends, so concurrent callers get unique, strictly
//! increasing IDs and readers only ever see complete entries.

use std::cmp::Ordering;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rayon::prelude::*;

use crate::fingerprint::encoder::FingerprintEncoder;

/// An entry in the similarity index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Index-assigned ID, equal to the entry's position
    pub id: u64,
    /// The fingerprint
    pub vector: Vec<f32>,
    /// Opaque caller data (the source URL)
    pub metadata: String,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: u64,
    /// Euclidean distance to the query
    pub distance: f32,
}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

pub struct SimilarityIndex {
    entries: RwLock<Vec<IndexEntry>>,
    dimension: usize,
    /// Identity of the encoder that produced the vectors, written to snapshots
    encoder_id: [u8; 32],
}

impl SimilarityIndex {
    /// Create an empty index for vectors of `dimension` values.
    pub fn new(dimension: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            dimension,
            encoder_id: [0u8; 32],
        }
    }

    /// Create an empty index sized and tagged for `encoder`'s output.
    pub fn for_encoder(encoder: &FingerprintEncoder) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            dimension: encoder.dimensions(),
            encoder_id: encoder.encoder_id(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn encoder_id(&self) -> &[u8; 32] {
        &self.encoder_id
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Append a vector and return its ID.
    ///
    /// A vector of the wrong length is rejected and the index is left untouched.
    pub fn add(&self, vector: Vec<f32>, metadata: impl Into<String>) -> Result<u64, IndexError> {
        self.check_dimension(&vector)?;

        let mut entries = self.write();
        let id = entries.len() as u64;
        entries.push(IndexEntry {
            id,
            vector,
            metadata: metadata.into(),
        });

        log::debug!("added fingerprint id={id} total={}", entries.len());
        Ok(id)
    }

    /// Clone the entry with the given ID.
    pub fn get(&self, id: u64) -> Option<IndexEntry> {
        let entries = self.read();
        usize::try_from(id)
            .ok()
            .and_then(|pos| entries.get(pos))
            .cloned()
    }

    /// Exact k-nearest-neighbor search by Euclidean distance.
    ///
    /// Returns at most `k` hits, nearest first. Equal distances are ordered by
    /// ascending ID so results are reproducible.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        self.check_dimension(query)?;

        if k == 0 {
            return Ok(vec![]);
        }

        let entries = self.read();
        let mut results: Vec<Neighbor> = entries
            .par_iter()
            .map(|entry| Neighbor {
                id: entry.id,
                distance: euclidean_distance(query, &entry.vector),
            })
            .collect();
        drop(entries);

        results.sort_by(compare_neighbors);
        results.truncate(k);

        Ok(results)
    }

    /// IDs of every entry whose metadata equals `metadata`, with the vector of
    /// the newest one. `None` if there is no such entry.
    pub fn find_by_metadata(&self, metadata: &str) -> Option<(Vec<u64>, Vec<f32>)> {
        let entries = self.read();

        let ids: Vec<u64> = entries
            .iter()
            .filter(|e| e.metadata == metadata)
            .map(|e| e.id)
            .collect();

        let latest = usize::try_from(*ids.last()?).ok()?;
        let vector = entries.get(latest)?.vector.clone();
        Some((ids, vector))
    }

    /// Snapshot of all entries in ID order.
    pub fn entries(&self) -> Vec<IndexEntry> {
        self.read().clone()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Vec<IndexEntry>> {
        // a panic while holding the lock cannot leave a half-pushed entry
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Vec<IndexEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        Ok(())
    }
}

fn compare_neighbors(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.id.cmp(&b.id))
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
