//! Chunk geometry
//!
//! Pure arithmetic between logical byte positions and the chunk grid of
//! the checksum table. The chunk size is a non-zero power of two, so every
//! division is a shift and every remainder a mask.

/// Chunk grid of one data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkGeometry {
    chunk_size: u64,
    shift: u32,
}

impl ChunkGeometry {
    /// Returns `None` unless `chunk_size` is a non-zero power of two.
    pub fn new(chunk_size: u32) -> Option<Self> {
        if !chunk_size.is_power_of_two() {
            return None;
        }
        Some(Self {
            chunk_size: u64::from(chunk_size),
            shift: chunk_size.trailing_zeros(),
        })
    }

    /// Chunk size in bytes
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Index of the chunk containing `pos`
    pub fn chunk_index(&self, pos: u64) -> u64 {
        pos >> self.shift
    }

    /// Offset of `pos` within its chunk
    pub fn offset_in_chunk(&self, pos: u64) -> u64 {
        pos & (self.chunk_size - 1)
    }

    /// Whether `pos` lies on a chunk boundary
    pub fn is_aligned(&self, pos: u64) -> bool {
        self.offset_in_chunk(pos) == 0
    }

    /// Start of the chunk containing `pos`
    pub fn align_down(&self, pos: u64) -> u64 {
        pos & !(self.chunk_size - 1)
    }

    /// First chunk boundary at or after `pos`
    pub fn align_up(&self, pos: u64) -> u64 {
        self.align_down(pos.saturating_add(self.chunk_size - 1))
    }

    /// Chunk-aligned superset `[start, end)` of the logical range `[beg, end)`
    pub fn aligned_window(&self, beg: u64, end: u64) -> (u64, u64) {
        (self.align_down(beg), self.align_up(end))
    }

    /// Number of chunks needed to cover `file_len` bytes
    pub fn chunk_count(&self, file_len: u64) -> u64 {
        self.chunk_index(self.align_up(file_len))
    }
}
