//! CRC-32 checksums for current-format (`m*`) SSTables
//!
//! Uses CRC-32 (IEEE polynomial) via `crc32fast`. Chunk checksums are folded
//! into the digest with CRC combination, so chunk bytes are never hashed
//! twice.

use crc32fast::Hasher;

use super::ChecksumAlgorithm;

/// CRC-32 binding of [`ChecksumAlgorithm`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32Checksum;

impl ChecksumAlgorithm for Crc32Checksum {
    const NAME: &'static str = "crc32";

    fn init() -> u32 {
        0
    }

    fn checksum(data: &[u8]) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(data);
        hasher.finalize()
    }

    fn combine_or_feed(seed: u32, chunk_checksum: u32, chunk: &[u8]) -> u32 {
        let mut acc = Hasher::new_with_initial(seed);
        acc.combine(&Hasher::new_with_initial_len(
            chunk_checksum,
            chunk.len() as u64,
        ));
        acc.finalize()
    }
}
