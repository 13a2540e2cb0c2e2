//! Per-chunk checksum table
//!
//! The checksum component (`*-CRC.db`) of an uncompressed SSTable is:
//!
//! ```text
//! [chunk_size: u32 BE][checksum_0: u32 BE][checksum_1: u32 BE]...
//! ```
//!
//! One checksum per `chunk_size` bytes of the data file; the last chunk may
//! be shorter than `chunk_size`.

use std::path::Path;

use crate::checksum::ChecksumAlgorithm;

/// Errors decoding a checksum component
#[derive(Debug, thiserror::Error)]
pub enum ChecksumTableError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checksum component too short: {0} bytes, need 4 for the chunk size")]
    MissingChunkSize(usize),

    #[error("Checksum component has {0} trailing bytes after the last checksum")]
    TrailingBytes(usize),

    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(u32),

    #[error("Invalid digest value: {0:?}")]
    InvalidDigest(String),
}

/// Result type for checksum table decoding
pub type ChecksumTableResult<T> = Result<T, ChecksumTableError>;

/// Checksums of every chunk of one data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumTable {
    chunk_size: u32,
    checksums: Vec<u32>,
}

impl ChecksumTable {
    /// Creates a table from already decoded parts.
    ///
    /// `chunk_size` is not validated here; the reader rejects invalid sizes
    /// when it is constructed.
    pub fn new(chunk_size: u32, checksums: Vec<u32>) -> Self {
        Self {
            chunk_size,
            checksums,
        }
    }

    /// Computes the table of `data` with algorithm `C`.
    ///
    /// A zero `chunk_size` yields an empty table with that chunk size.
    pub fn compute<C: ChecksumAlgorithm>(data: &[u8], chunk_size: u32) -> Self {
        let checksums = if chunk_size == 0 {
            Vec::new()
        } else {
            data.chunks(chunk_size as usize).map(C::checksum).collect()
        };
        Self::new(chunk_size, checksums)
    }

    /// Decodes the on-disk checksum component.
    pub fn decode(bytes: &[u8]) -> ChecksumTableResult<Self> {
        if bytes.len() < 4 {
            return Err(ChecksumTableError::MissingChunkSize(bytes.len()));
        }
        let (header, body) = bytes.split_at(4);
        let chunk_size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        if !chunk_size.is_power_of_two() {
            return Err(ChecksumTableError::InvalidChunkSize(chunk_size));
        }

        let trailing = body.len() % 4;
        if trailing != 0 {
            return Err(ChecksumTableError::TrailingBytes(trailing));
        }

        let checksums = body
            .chunks_exact(4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(Self::new(chunk_size, checksums))
    }

    /// Reads and decodes a checksum component file.
    pub async fn load(path: &Path) -> ChecksumTableResult<Self> {
        let bytes = tokio::fs::read(path).await?;
        Self::decode(&bytes)
    }

    /// Chunk size in bytes
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// All checksums, in chunk order
    pub fn checksums(&self) -> &[u32] {
        &self.checksums
    }

    /// Checksum of chunk `index`, if the table has one
    pub fn get(&self, index: u64) -> Option<u32> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.checksums.get(i).copied())
    }

    /// Number of chunks described
    pub fn len(&self) -> usize {
        self.checksums.len()
    }

    /// Returns `true` if the table has no checksums
    pub fn is_empty(&self) -> bool {
        self.checksums.is_empty()
    }
}
