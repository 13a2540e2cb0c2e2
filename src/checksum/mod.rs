//! Checksum algorithms for SSTable data integrity
//!
//! Every uncompressed SSTable data file is covered by a table of per-chunk
//! checksums, and optionally by a whole-file digest. The two on-disk format
//! families differ only in the algorithm:
//!
//! - Legacy (`ka`, `la`): Adler-32
//! - Current (`mc`, `md`, `me`): CRC-32 (IEEE polynomial)
//!
//! The reader is generic over [`ChecksumAlgorithm`], so chunk validation and
//! digest accumulation are shared between both formats.

mod adler32;
mod crc32;

pub use self::adler32::Adler32Checksum;
pub use self::crc32::Crc32Checksum;

/// Checksum capability used by the chunked reader.
///
/// `combine_or_feed` folds one chunk into a running whole-file digest. An
/// algorithm may either combine the already computed chunk checksum
/// arithmetically or feed the chunk bytes into a rolling state; either way
/// the final value must equal `checksum` over the concatenation of all
/// chunks.
pub trait ChecksumAlgorithm: Send + Sync + 'static {
    /// Short algorithm name, used in diagnostics.
    const NAME: &'static str;

    /// Digest value of the empty input.
    fn init() -> u32;

    /// Checksum of `data`.
    fn checksum(data: &[u8]) -> u32;

    /// Extends `seed` (the digest of all previous chunks) with one chunk.
    fn combine_or_feed(seed: u32, chunk_checksum: u32, chunk: &[u8]) -> u32;
}

/// Computes a whole-buffer digest by folding it in `chunk_size` pieces.
///
/// Equivalent to `C::checksum(data)`; exists so callers can check the
/// folding law for an algorithm without a reader.
pub fn fold_digest<C: ChecksumAlgorithm>(data: &[u8], chunk_size: usize) -> u32 {
    data.chunks(chunk_size.max(1)).fold(C::init(), |acc, chunk| {
        C::combine_or_feed(acc, C::checksum(chunk), chunk)
    })
}
