//! Binary snapshots of the similarity index.
//!
//! File format: fingerprints.bin
//!
//! Header (49 bytes):
//! - version: u8 (1)
//! - encoder_id: [u8; 32] (SHA256 of the encoder scheme and parameters)
//! - dimension: u32 (little-endian)
//! - entry_count: u64 (little-endian)
//! - checksum: u32 (CRC32 of header fields before checksum)
//!
//! Entries (repeated, in ID order):
//! - id: u64 (little-endian)
//! - metadata_len: u32 (little-endian)
//! - metadata: [u8; metadata_len] (UTF-8)
//! - vector: [f32; dimension] (little-endian)

use std::io::{Read, Write};

use crate::fingerprint::index::{IndexEntry, SimilarityIndex};

/// Current file format version
const FORMAT_VERSION: u8 = 1;

/// Header size in bytes: version(1) + encoder_id(32) + dimension(4) + entry_count(8) + checksum(4)
const HEADER_SIZE: usize = 49;

/// Bytes covered by the header checksum
const CHECKSUMMED: usize = HEADER_SIZE - 4;

/// Errors that can occur while writing or reading a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid snapshot format: {0}")]
    InvalidFormat(String),

    #[error("Version mismatch: snapshot version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("Encoder mismatch: snapshot was written by a different encoder")]
    EncoderMismatch,

    #[error("Checksum mismatch: snapshot may be corrupted")]
    ChecksumMismatch,

    #[error("Dimension mismatch: expected {expected}, snapshot has {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

#[derive(Debug)]
struct Header {
    version: u8,
    encoder_id: [u8; 32],
    dimension: u32,
    entry_count: u64,
}

impl SimilarityIndex {
    /// Serialize every entry to `writer`.
    ///
    /// Holds the read lock for the duration, so the snapshot is a consistent
    /// prefix of the ID sequence.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<(), SnapshotError> {
        let entries = self.read();

        let header = Header {
            version: FORMAT_VERSION,
            encoder_id: *self.encoder_id(),
            dimension: u32::try_from(self.dimension()).map_err(|_| {
                SnapshotError::InvalidFormat(format!("dimension {} too large", self.dimension()))
            })?,
            entry_count: entries.len() as u64,
        };
        write_header(writer, &header)?;

        for entry in entries.iter() {
            write_entry(writer, entry)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Replace the index contents with a snapshot read from `reader`.
    ///
    /// The snapshot must come from the same encoder and dimension, and its IDs
    /// must be exactly `0..n`. Subsequent `add` calls continue at `n`. On any
    /// error the current contents are kept.
    pub fn load<R: Read>(&self, reader: &mut R) -> Result<usize, SnapshotError> {
        let header = read_header(reader)?;

        if header.encoder_id != *self.encoder_id() {
            return Err(SnapshotError::EncoderMismatch);
        }

        if header.dimension as usize != self.dimension() {
            return Err(SnapshotError::DimensionMismatch {
                expected: self.dimension(),
                got: header.dimension as usize,
            });
        }

        let count = usize::try_from(header.entry_count).map_err(|_| {
            SnapshotError::InvalidFormat(format!("entry count {} too large", header.entry_count))
        })?;

        let mut loaded = Vec::with_capacity(count.min(1 << 16));
        for position in 0..count {
            let entry = read_entry(reader, self.dimension())?;
            if entry.id != position as u64 {
                return Err(SnapshotError::InvalidFormat(format!(
                    "expected id {position}, found {}",
                    entry.id
                )));
            }
            loaded.push(entry);
        }

        *self.write() = loaded;

        log::info!("restored {count} fingerprints from snapshot");
        Ok(count)
    }
}

fn write_header<W: Write>(writer: &mut W, header: &Header) -> Result<(), SnapshotError> {
    let mut header_bytes = [0u8; HEADER_SIZE];

    header_bytes[0] = header.version;
    header_bytes[1..33].copy_from_slice(&header.encoder_id);
    header_bytes[33..37].copy_from_slice(&header.dimension.to_le_bytes());
    header_bytes[37..45].copy_from_slice(&header.entry_count.to_le_bytes());

    let checksum = crc32fast::hash(&header_bytes[0..CHECKSUMMED]);
    header_bytes[45..49].copy_from_slice(&checksum.to_le_bytes());

    writer.write_all(&header_bytes)?;
    Ok(())
}

fn read_header<R: Read>(reader: &mut R) -> Result<Header, SnapshotError> {
    let mut header_bytes = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_bytes)?;

    let version = header_bytes[0];
    if version != FORMAT_VERSION {
        return Err(SnapshotError::VersionMismatch(version, FORMAT_VERSION));
    }

    let stored_checksum = u32::from_le_bytes(le_array(&header_bytes[45..49]));
    if stored_checksum != crc32fast::hash(&header_bytes[0..CHECKSUMMED]) {
        return Err(SnapshotError::ChecksumMismatch);
    }

    let mut encoder_id = [0u8; 32];
    encoder_id.copy_from_slice(&header_bytes[1..33]);

    Ok(Header {
        version,
        encoder_id,
        dimension: u32::from_le_bytes(le_array(&header_bytes[33..37])),
        entry_count: u64::from_le_bytes(le_array(&header_bytes[37..45])),
    })
}

fn write_entry<W: Write>(writer: &mut W, entry: &IndexEntry) -> Result<(), SnapshotError> {
    let metadata = entry.metadata.as_bytes();
    let metadata_len = u32::try_from(metadata.len()).map_err(|_| {
        SnapshotError::InvalidFormat(format!("metadata of entry {} too long", entry.id))
    })?;

    writer.write_all(&entry.id.to_le_bytes())?;
    writer.write_all(&metadata_len.to_le_bytes())?;
    writer.write_all(metadata)?;

    for &value in &entry.vector {
        writer.write_all(&value.to_le_bytes())?;
    }

    Ok(())
}

fn read_entry<R: Read>(reader: &mut R, dimension: usize) -> Result<IndexEntry, SnapshotError> {
    let mut id_bytes = [0u8; 8];
    reader.read_exact(&mut id_bytes)?;
    let id = u64::from_le_bytes(id_bytes);

    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let metadata_len = u32::from_le_bytes(len_bytes) as usize;

    let mut metadata = Vec::new();
    (&mut *reader)
        .take(metadata_len as u64)
        .read_to_end(&mut metadata)?;
    if metadata.len() != metadata_len {
        return Err(SnapshotError::InvalidFormat(format!(
            "truncated metadata for entry {id}"
        )));
    }
    let metadata = String::from_utf8(metadata)
        .map_err(|e| SnapshotError::InvalidFormat(format!("entry {id}: {e}")))?;

    let mut vector = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let mut float_bytes = [0u8; 4];
        reader.read_exact(&mut float_bytes)?;
        vector.push(f32::from_le_bytes(float_bytes));
    }

    Ok(IndexEntry {
        id,
        vector,
        metadata,
    })
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}
