//! Content fingerprints and similarity retrieval.
//!
//! # Architecture
//!
//! - `encoder`: Hashed bag-of-words text fingerprints
//! - `index`: Append-only index with exact L2 k-nearest-neighbor search
//! - `snapshot`: Binary save/load for the index

mod encoder;
mod index;
mod snapshot;

pub use encoder::{FingerprintEncoder, DEFAULT_DIMENSIONS, DEFAULT_MAX_TOKENS};
pub use index::{IndexEntry, IndexError, Neighbor, SimilarityIndex};
pub use snapshot::SnapshotError;
