//! Checksummed SSTable data reading
//!
//! Reads uncompressed SSTable data files whose integrity is covered by a
//! per-chunk checksum table (`*-CRC.db`) and, optionally, a whole-file
//! digest (`*-Digest.*`).
//!
//! # Guarantees
//!
//! 1. Every chunk is validated before any of its bytes are returned
//! 2. A failed chunk fails the read with `SSTABLE_MALFORMED`
//! 3. A digest mismatch is reported through the [`DigestSlot`] only
//! 4. Skipping never reads the skipped chunks
//!
//! # Usage
//!
//! ```ignore
//! let table = ChecksumTable::load(&crc_path).await?;
//! let file = tokio::fs::File::open(&data_path).await?;
//! let request = ChecksummedRead::new(file_len, offset, length);
//! let mut input = make_checksummed_current_input_stream(file, &table, request)?;
//! let bytes = input.read_to_end().await?;
//! input.close().await?;
//! ```

mod checksum_table;
mod digest;
mod errors;
mod geometry;
mod input_stream;
mod reader;
mod source;

pub use checksum_table::{ChecksumTable, ChecksumTableError, ChecksumTableResult};
pub use digest::{
    load_digest, parse_digest, DigestAccumulator, DigestSlot, DigestStatus,
    DigestValidationResult, IntegrityErrorHandler,
};
pub use errors::{
    on_internal_error, ChecksumFailure, ReaderError, ReaderErrorCode, ReaderResult, Severity,
};
pub use geometry::ChunkGeometry;
pub use input_stream::InputStream;
pub use reader::{ChecksummedRead, ChecksummedReader, DataSource, ReaderFuture};
pub use source::{
    ByteStream, DataFile, FileInputStream, IoFuture, MemoryFile, MemoryStream, StreamOptions,
};

use crate::checksum::{Adler32Checksum, ChecksumAlgorithm, Crc32Checksum};

/// On-disk format family of an SSTable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SstableFormat {
    /// `ka`, `la`: Adler-32 checksums
    Legacy,
    /// `mc`, `md`, `me`: CRC-32 checksums
    Current,
}

impl SstableFormat {
    /// Format family of an SSTable version string
    pub fn from_version(version: &str) -> Option<Self> {
        match version {
            "ka" | "la" => Some(SstableFormat::Legacy),
            "mc" | "md" | "me" => Some(SstableFormat::Current),
            _ => None,
        }
    }

    /// Name of the checksum algorithm
    pub fn algorithm(&self) -> &'static str {
        match self {
            SstableFormat::Legacy => Adler32Checksum::NAME,
            SstableFormat::Current => Crc32Checksum::NAME,
        }
    }

    /// Suffix of the digest component file
    pub fn digest_component(&self) -> &'static str {
        match self {
            SstableFormat::Legacy => "Digest.adler32",
            SstableFormat::Current => "Digest.crc32",
        }
    }

    /// Computes the checksum table of `data` in this format
    pub fn compute_table(&self, data: &[u8], chunk_size: u32) -> ChecksumTable {
        match self {
            SstableFormat::Legacy => ChecksumTable::compute::<Adler32Checksum>(data, chunk_size),
            SstableFormat::Current => ChecksumTable::compute::<Crc32Checksum>(data, chunk_size),
        }
    }

    /// Whole-file digest of `data` in this format
    pub fn digest(&self, data: &[u8]) -> u32 {
        match self {
            SstableFormat::Legacy => Adler32Checksum::checksum(data),
            SstableFormat::Current => Crc32Checksum::checksum(data),
        }
    }
}

/// Opens a checksummed input stream with algorithm `C`.
pub fn make_checksummed_file_input_stream<'t, C, F>(
    file: F,
    table: &'t ChecksumTable,
    request: ChecksummedRead,
) -> ReaderResult<InputStream<'t>>
where
    C: ChecksumAlgorithm,
    F: DataFile,
    F::Stream: 't,
{
    let reader = ChecksummedReader::<C, F::Stream>::open(file, table, request)?;
    Ok(InputStream::new(Box::new(reader)))
}

/// Opens a checksummed input stream over a legacy (`ka`/`la`) data file.
pub fn make_checksummed_legacy_input_stream<'t, F>(
    file: F,
    table: &'t ChecksumTable,
    request: ChecksummedRead,
) -> ReaderResult<InputStream<'t>>
where
    F: DataFile,
    F::Stream: 't,
{
    make_checksummed_file_input_stream::<Adler32Checksum, F>(file, table, request)
}

/// Opens a checksummed input stream over a current (`mc`/`md`/`me`) data file.
pub fn make_checksummed_current_input_stream<'t, F>(
    file: F,
    table: &'t ChecksumTable,
    request: ChecksummedRead,
) -> ReaderResult<InputStream<'t>>
where
    F: DataFile,
    F::Stream: 't,
{
    make_checksummed_file_input_stream::<Crc32Checksum, F>(file, table, request)
}

/// Opens a checksummed input stream in the algorithm of `format`.
pub fn make_checksummed_input_stream<'t, F>(
    format: SstableFormat,
    file: F,
    table: &'t ChecksumTable,
    request: ChecksummedRead,
) -> ReaderResult<InputStream<'t>>
where
    F: DataFile,
    F::Stream: 't,
{
    match format {
        SstableFormat::Legacy => make_checksummed_legacy_input_stream(file, table, request),
        SstableFormat::Current => make_checksummed_current_input_stream(file, table, request),
    }
}
