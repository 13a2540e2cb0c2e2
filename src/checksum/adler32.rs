//! Adler-32 checksums for legacy-format (`ka`, `la`) SSTables
//!
//! The digest is accumulated by feeding chunk bytes into a rolling Adler-32
//! state resumed from the previous value.

use ::adler32::RollingAdler32;

use super::ChecksumAlgorithm;

/// Adler-32 binding of [`ChecksumAlgorithm`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Adler32Checksum;

impl ChecksumAlgorithm for Adler32Checksum {
    const NAME: &'static str = "adler32";

    fn init() -> u32 {
        1
    }

    fn checksum(data: &[u8]) -> u32 {
        RollingAdler32::from_buffer(data).hash()
    }

    fn combine_or_feed(seed: u32, _chunk_checksum: u32, chunk: &[u8]) -> u32 {
        let mut rolling = RollingAdler32::from_value(seed);
        rolling.update_buffer(chunk);
        rolling.hash()
    }
}
