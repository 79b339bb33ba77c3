//! Hashed bag-of-words text fingerprints.
//!
//! Each whitespace token is hashed into one of `dimensions` buckets and the
//! bucket counts are L2-normalized:
//! 1. Lowercase the text
//! 2. Split on whitespace, keep the first `max_tokens` tokens
//! 3. Bucket = CRC-32 (IEEE) of the token's UTF-8 bytes, modulo `dimensions`
//! 4. Divide by the Euclidean norm unless the vector is all zeros
//!
//! CRC-32 is fixed and unseeded, so the same text maps to a bit-identical
//! vector in every process. Collisions are not resolved.

use sha2::{Digest, Sha256};

/// Default fingerprint dimensions
pub const DEFAULT_DIMENSIONS: usize = 768;

/// Default cap on the number of tokens hashed per text
pub const DEFAULT_MAX_TOKENS: usize = 500;

/// Name of the hashing scheme, part of the encoder identity
const SCHEME: &str = "crc32-bow:v1";

#[derive(Debug, Clone)]
pub struct FingerprintEncoder {
    dimensions: usize,
    max_tokens: usize,
}

impl Default for FingerprintEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS, DEFAULT_MAX_TOKENS)
    }
}

impl FingerprintEncoder {
    /// `dimensions` must be non-zero; config validation enforces it.
    pub fn new(dimensions: usize, max_tokens: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            max_tokens,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Encode text into a fingerprint of exactly `dimensions` values.
    ///
    /// Empty input (or input with no tokens) yields the zero vector.
    pub fn encode(&self, text: &str) -> Vec<f32> {
        let mut fingerprint = vec![0.0f32; self.dimensions];

        let lowered = text.to_lowercase();
        for token in lowered.split_whitespace().take(self.max_tokens) {
            let bucket = crc32fast::hash(token.as_bytes()) as usize % self.dimensions;
            fingerprint[bucket] += 1.0;
        }

        let norm = l2_norm(&fingerprint);
        if norm > 0.0 {
            for value in fingerprint.iter_mut() {
                *value /= norm;
            }
        }

        fingerprint
    }

    /// SHA-256 over the scheme name and parameters.
    ///
    /// Stored in index snapshots so vectors from a differently configured
    /// encoder are never mixed into one index.
    pub fn encoder_id(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(format!("{SCHEME}:{}:{}", self.dimensions, self.max_tokens).as_bytes());
        hasher.finalize().into()
    }
}

pub(crate) fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
