//! Checksummed chunk reader
//!
//! Reads a logical byte range `[offset, offset + length)` of an uncompressed
//! data file. The range is widened to whole chunks, every chunk is validated
//! against the checksum table before any of its bytes are returned, and the
//! result is trimmed back to the logical range.
//!
//! Invariants:
//! - `beg_pos <= pos <= end_pos <= file_len`
//! - `underlying_pos` is always chunk-aligned
//! - No byte is returned from a chunk that failed its checksum
//! - The digest slot reaches a terminal state at most once
//! - At most one underlying stream is opened per reader

use std::future::Future;
use std::pin::Pin;

use crate::checksum::ChecksumAlgorithm;
use crate::config::ReaderConfig;
use crate::observability::{log_event_with_fields, Event};

use super::checksum_table::ChecksumTable;
use super::digest::{DigestAccumulator, DigestSlot, DigestValidationResult};
use super::errors::{on_internal_error, ChecksumFailure, ReaderError, ReaderResult};
use super::geometry::ChunkGeometry;
use super::source::{ByteStream, DataFile, StreamOptions};

/// Boxed future returned by data source operations
pub type ReaderFuture<'a, T> = Pin<Box<dyn Future<Output = ReaderResult<T>> + Send + 'a>>;

/// Pull-based source of buffers.
///
/// An empty buffer from `get` means end of stream.
pub trait DataSource: Send {
    /// Next buffer of the range
    fn get(&mut self) -> ReaderFuture<'_, Vec<u8>>;

    /// Advances `n` bytes without returning them. Always yields an empty
    /// buffer.
    fn skip(&mut self, n: u64) -> ReaderFuture<'_, Vec<u8>>;

    /// Releases the underlying stream
    fn close(&mut self) -> ReaderFuture<'_, ()>;
}

/// Parameters of one checksummed read.
#[derive(Debug, Clone)]
pub struct ChecksummedRead {
    /// Length of the data file
    pub file_len: u64,
    /// First logical byte to read
    pub offset: u64,
    /// Number of bytes to read; clamped to the end of the file
    pub length: u64,
    /// Stream options; from the configuration when unset
    pub options: Option<StreamOptions>,
    /// Whole-file digest to validate against
    pub expected_digest: Option<u32>,
    /// Where the digest outcome is reported
    pub digest_slot: Option<DigestSlot>,
    /// Reader configuration; [`ReaderConfig::global`] when unset
    pub config: Option<ReaderConfig>,
}

impl ChecksummedRead {
    pub fn new(file_len: u64, offset: u64, length: u64) -> Self {
        Self {
            file_len,
            offset,
            length,
            options: None,
            expected_digest: None,
            digest_slot: None,
            config: None,
        }
    }

    /// Reads the whole file
    pub fn full_file(file_len: u64) -> Self {
        Self::new(file_len, 0, file_len)
    }

    pub fn with_options(mut self, options: StreamOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Validates the whole-file digest, reporting into `slot`
    pub fn with_digest(mut self, expected: u32, slot: DigestSlot) -> Self {
        self.expected_digest = Some(expected);
        self.digest_slot = Some(slot);
        self
    }

    pub fn with_expected_digest(mut self, expected: u32) -> Self {
        self.expected_digest = Some(expected);
        self
    }

    pub fn with_digest_slot(mut self, slot: DigestSlot) -> Self {
        self.digest_slot = Some(slot);
        self
    }

    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Chunked, checksum-validating reader over one byte stream.
pub struct ChecksummedReader<'t, C, S> {
    table: &'t ChecksumTable,
    geometry: ChunkGeometry,
    config: ReaderConfig,
    stream: Option<S>,
    file_len: u64,
    pos: u64,
    beg_pos: u64,
    end_pos: u64,
    underlying_pos: u64,
    digest_requested: bool,
    digest: Option<DigestAccumulator<C>>,
    digest_slot: Option<DigestSlot>,
    in_flight: bool,
    poisoned: bool,
}

impl<'t, C, S> ChecksummedReader<'t, C, S>
where
    C: ChecksumAlgorithm,
    S: ByteStream,
{
    /// Validates the request and opens the underlying stream over the
    /// chunk-aligned window.
    ///
    /// Empty requests (zero length, or an offset at the end of the file)
    /// open nothing.
    pub fn open<F>(file: F, table: &'t ChecksumTable, request: ChecksummedRead) -> ReaderResult<Self>
    where
        F: DataFile<Stream = S>,
    {
        let config = request
            .config
            .unwrap_or_else(|| ReaderConfig::global().clone());

        let chunk_size = table.chunk_size();
        let geometry = match ChunkGeometry::new(chunk_size) {
            Some(geometry) => geometry,
            None => {
                return Err(on_internal_error(
                    &config,
                    format!("Invalid chunk size: {}", chunk_size),
                ))
            }
        };

        let file_len = request.file_len;
        let pos = request.offset;
        if pos > file_len {
            return Err(on_internal_error(&config, "attempt to read beyond end"));
        }

        let mut reader = Self {
            table,
            geometry,
            config,
            stream: None,
            file_len,
            pos,
            beg_pos: pos,
            end_pos: pos,
            underlying_pos: geometry.align_down(pos),
            digest_requested: request.expected_digest.is_some(),
            digest: None,
            digest_slot: None,
            in_flight: false,
            poisoned: false,
        };

        if request.length == 0 || pos == file_len {
            return Ok(reader);
        }
        reader.end_pos = pos.saturating_add(request.length).min(file_len);

        if let Some(expected) = request.expected_digest {
            if reader.end_pos - pos < file_len {
                return Err(on_internal_error(
                    &reader.config,
                    format!(
                        "Cannot check digest with a partial read: current pos={}, end pos={}, file len={}",
                        pos, reader.end_pos, file_len
                    ),
                ));
            }
            let slot = match request.digest_slot {
                Some(slot) => slot,
                None => {
                    return Err(on_internal_error(
                        &reader.config,
                        "Requested digest check but no output parameter was provided.",
                    ))
                }
            };
            slot.set(DigestValidationResult::in_progress());
            reader.digest = Some(DigestAccumulator::new(expected));
            reader.digest_slot = Some(slot);
        }

        let (start, end) = geometry.aligned_window(reader.beg_pos, reader.end_pos);
        let options = request
            .options
            .unwrap_or_else(|| StreamOptions::from_config(&reader.config));
        reader.stream = Some(file.open_stream(start, end - start, options));
        reader.underlying_pos = start;

        let (start, len, chunk) = (
            start.to_string(),
            (end - start).to_string(),
            chunk_size.to_string(),
        );
        log_event_with_fields(
            Event::ReaderOpened,
            &[
                ("algorithm", C::NAME),
                ("chunk_size", chunk.as_str()),
                ("len", len.as_str()),
                ("start", start.as_str()),
            ],
        );

        Ok(reader)
    }

    /// Current logical position
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Exclusive end of the logical range
    pub fn end_position(&self) -> u64 {
        self.end_pos
    }

    /// Whether an underlying stream is open
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Whether a previous failure or cancellation made the reader unusable
    pub fn is_poisoned(&self) -> bool {
        self.poisoned || self.in_flight
    }

    fn begin(&mut self) -> ReaderResult<()> {
        if self.is_poisoned() {
            self.poisoned = true;
            return Err(desync(format!(
                "Checksummed reader unusable after a failed or cancelled operation: pos={}",
                self.pos
            )));
        }
        self.in_flight = true;
        Ok(())
    }

    fn finish<T>(&mut self, result: ReaderResult<T>) -> ReaderResult<T> {
        self.in_flight = false;
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    async fn next_buffer(&mut self) -> ReaderResult<Vec<u8>> {
        self.begin()?;
        let result = self.read_chunk().await;
        self.finish(result)
    }

    async fn read_chunk(&mut self) -> ReaderResult<Vec<u8>> {
        if self.pos >= self.end_pos {
            return Ok(Vec::new());
        }

        let chunk_size = self.geometry.chunk_size();
        if self.pos != self.beg_pos && !self.geometry.is_aligned(self.pos) {
            return Err(desync(format!(
                "Checksummed reader not aligned to chunk boundary: pos={}, chunk_size={}",
                self.pos, chunk_size
            )));
        }

        let (pos, underlying_pos) = (self.pos, self.underlying_pos);
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => {
                return Err(desync(format!(
                    "Checksummed reader used after close: pos={}",
                    pos
                )))
            }
        };
        let mut buf = stream
            .read_exactly(chunk_size as usize)
            .await
            .map_err(|e| {
                ReaderError::read_failed(
                    format!("Failed to read chunk at file offset {}", underlying_pos),
                    e,
                )
            })?;

        let want = chunk_size.min(self.file_len - underlying_pos);
        if (buf.len() as u64) < want {
            return Err(ReaderError::malformed_at_offset(
                underlying_pos,
                format!(
                    "Short read of checksummed chunk at file offset {}: expected {} bytes, got {}",
                    underlying_pos,
                    want,
                    buf.len()
                ),
            ));
        }

        let index = self.geometry.chunk_index(underlying_pos);
        let expected = match self.table.get(index) {
            Some(expected) => expected,
            None => {
                return Err(ReaderError::malformed_at_offset(
                    underlying_pos,
                    format!(
                        "Checksum table has no entry for chunk {} ({} entries)",
                        index,
                        self.table.len()
                    ),
                ))
            }
        };
        let actual = C::checksum(&buf);
        if expected != actual {
            let failure = ChecksumFailure {
                chunk_size: buf.len(),
                file_offset: underlying_pos,
                expected,
                actual,
            };
            let (offset, expected, actual) = (
                underlying_pos.to_string(),
                expected.to_string(),
                actual.to_string(),
            );
            log_event_with_fields(
                Event::ChunkChecksumMismatch,
                &[
                    ("actual", actual.as_str()),
                    ("algorithm", C::NAME),
                    ("expected", expected.as_str()),
                    ("file_offset", offset.as_str()),
                ],
            );
            return Err(ReaderError::checksum_mismatch(failure));
        }

        if let Some(digest) = self.digest.as_mut() {
            digest.update(actual, &buf);
        }

        let front = self.geometry.offset_in_chunk(self.pos) as usize;
        buf.drain(..front.min(buf.len()));
        let left = self.end_pos - self.pos;
        if buf.len() as u64 > left {
            buf.truncate(left as usize);
        }

        self.pos += buf.len() as u64;
        self.underlying_pos += chunk_size;

        if self.pos == self.file_len {
            if let Some(digest) = self.digest.take() {
                let result = digest.finish();
                if let Some(slot) = &self.digest_slot {
                    slot.set(result);
                }
            }
        }

        Ok(buf)
    }

    async fn skip_forward(&mut self, n: u64) -> ReaderResult<Vec<u8>> {
        self.begin()?;
        let result = self.advance(n).await;
        self.finish(result)
    }

    async fn advance(&mut self, n: u64) -> ReaderResult<Vec<u8>> {
        if self.digest_requested {
            return Err(on_internal_error(
                &self.config,
                "Tried to skip on a data source for which digest check has been requested.",
            ));
        }

        let target = match self.pos.checked_add(n) {
            Some(target) if target <= self.end_pos => target,
            _ => {
                return Err(on_internal_error(
                    &self.config,
                    format!(
                        "Skipping over the end position is disallowed: current pos={}, end pos={}, skip len={}",
                        self.pos, self.end_pos, n
                    ),
                ))
            }
        };

        self.pos = target;
        if self.pos == self.end_pos {
            return Ok(Vec::new());
        }

        let underlying_skip = self.geometry.align_down(self.pos) - self.underlying_pos;
        self.beg_pos = self.pos;
        self.underlying_pos += underlying_skip;

        let pos = self.pos;
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => {
                return Err(desync(format!(
                    "Checksummed reader used after close: pos={}",
                    pos
                )))
            }
        };
        stream.skip(underlying_skip).await.map_err(|e| {
            ReaderError::read_failed(format!("Failed to skip {} bytes", underlying_skip), e)
        })?;

        Ok(Vec::new())
    }

    async fn close_underlying(&mut self) -> ReaderResult<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        stream
            .close()
            .await
            .map_err(|e| ReaderError::read_failed("Failed to close checksummed stream", e))?;

        let pos = self.pos.to_string();
        log_event_with_fields(
            Event::ReaderClosed,
            &[("algorithm", C::NAME), ("pos", pos.as_str())],
        );
        Ok(())
    }
}

fn desync(message: String) -> ReaderError {
    log_event_with_fields(Event::ReaderDesync, &[("message", message.as_str())]);
    ReaderError::desync(message)
}

impl<'t, C, S> DataSource for ChecksummedReader<'t, C, S>
where
    C: ChecksumAlgorithm,
    S: ByteStream,
{
    fn get(&mut self) -> ReaderFuture<'_, Vec<u8>> {
        Box::pin(self.next_buffer())
    }

    fn skip(&mut self, n: u64) -> ReaderFuture<'_, Vec<u8>> {
        Box::pin(self.skip_forward(n))
    }

    fn close(&mut self) -> ReaderFuture<'_, ()> {
        Box::pin(self.close_underlying())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::Crc32Checksum;
    use crate::sstable::digest::DigestStatus;
    use crate::sstable::source::{MemoryFile, MemoryStream};

    const CHUNK: u32 = 16;

    fn data(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 256) as u8).collect()
    }

    fn reader<'t>(
        file: &MemoryFile,
        table: &'t ChecksumTable,
        request: ChecksummedRead,
    ) -> ReaderResult<ChecksummedReader<'t, Crc32Checksum, MemoryStream>> {
        ChecksummedReader::open(file.clone(), table, request.with_config(ReaderConfig::default()))
    }

    async fn drain<D: DataSource>(source: &mut D) -> ReaderResult<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let buf = source.get().await?;
            if buf.is_empty() {
                return Ok(out);
            }
            out.extend_from_slice(&buf);
        }
    }

    #[tokio::test]
    async fn test_reads_unaligned_range() {
        let bytes = data(100);
        let file = MemoryFile::new(bytes.clone());
        let table = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);

        let mut r = reader(&file, &table, ChecksummedRead::new(100, 5, 40)).unwrap();
        assert_eq!(drain(&mut r).await.unwrap(), &bytes[5..45]);
        assert_eq!(r.position(), 45);
        r.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_length_clamped_to_file() {
        let bytes = data(50);
        let file = MemoryFile::new(bytes.clone());
        let table = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);

        let mut r = reader(&file, &table, ChecksummedRead::new(50, 20, 1_000)).unwrap();
        assert_eq!(r.end_position(), 50);
        assert_eq!(drain(&mut r).await.unwrap(), &bytes[20..]);
    }

    #[tokio::test]
    async fn test_invalid_chunk_size_is_fatal() {
        let bytes = data(10);
        let file = MemoryFile::new(bytes.clone());
        let table = ChecksumTable::new(12, vec![0]);

        let err = reader(&file, &table, ChecksummedRead::full_file(10)).err().unwrap();
        assert!(err.is_fatal());
        assert!(err.message().contains("Invalid chunk size: 12"));
    }

    #[tokio::test]
    async fn test_offset_past_end_is_fatal() {
        let bytes = data(10);
        let file = MemoryFile::new(bytes.clone());
        let table = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);

        let err = reader(&file, &table, ChecksummedRead::new(10, 11, 1)).err().unwrap();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_degenerate_reader_opens_nothing() {
        let bytes = data(32);
        let file = MemoryFile::new(bytes.clone());
        let table = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);

        let mut r = reader(&file, &table, ChecksummedRead::new(32, 4, 0)).unwrap();
        assert!(!r.is_open());
        assert!(r.get().await.unwrap().is_empty());
        r.close().await.unwrap();

        let mut r = reader(&file, &table, ChecksummedRead::new(32, 32, 8)).unwrap();
        assert!(!r.is_open());
        assert!(r.get().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_chunk_fails_and_poisons() {
        let mut bytes = data(64);
        let table = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);
        bytes[40] ^= 0xFF;
        let file = MemoryFile::new(bytes);

        let mut r = reader(&file, &table, ChecksummedRead::full_file(64)).unwrap();
        assert_eq!(r.get().await.unwrap().len(), 16);
        assert_eq!(r.get().await.unwrap().len(), 16);
        let err = r.get().await.unwrap_err();
        assert!(err.is_malformed());
        assert_eq!(err.checksum_failure().unwrap().file_offset, 32);

        let err = r.get().await.unwrap_err();
        assert_eq!(err.code(), crate::sstable::ReaderErrorCode::ReaderDesync);
        r.close().await.unwrap();
    }

    /// Stream whose reads never complete
    struct StalledStream;

    impl ByteStream for StalledStream {
        fn read_exactly(&mut self, _n: usize) -> crate::sstable::IoFuture<'_, Vec<u8>> {
            Box::pin(std::future::pending())
        }

        fn skip(&mut self, _n: u64) -> crate::sstable::IoFuture<'_, ()> {
            Box::pin(std::future::pending())
        }

        fn close(&mut self) -> crate::sstable::IoFuture<'_, ()> {
            Box::pin(async { Ok(()) })
        }
    }

    struct StalledFile;

    impl DataFile for StalledFile {
        type Stream = StalledStream;

        fn open_stream(self, _start: u64, _len: u64, _options: StreamOptions) -> StalledStream {
            StalledStream
        }
    }

    #[tokio::test]
    async fn test_cancelled_get_poisons_until_close() {
        let bytes = data(64);
        let table = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);
        let request = ChecksummedRead::full_file(64).with_config(ReaderConfig::default());
        let mut r =
            ChecksummedReader::<Crc32Checksum, StalledStream>::open(StalledFile, &table, request)
                .unwrap();

        let pending = tokio::time::timeout(std::time::Duration::from_millis(10), r.get()).await;
        assert!(pending.is_err());
        assert!(r.is_poisoned());

        let err = r.get().await.unwrap_err();
        assert_eq!(err.code(), crate::sstable::ReaderErrorCode::ReaderDesync);
        assert!(!err.is_fatal());
        let err = r.skip(1).await.unwrap_err();
        assert_eq!(err.code(), crate::sstable::ReaderErrorCode::ReaderDesync);

        r.close().await.unwrap();
        assert!(!r.is_open());
    }

    #[tokio::test]
    async fn test_unaligned_position_is_desync() {
        let bytes = data(64);
        let file = MemoryFile::new(bytes.clone());
        let table = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);

        let mut r = reader(&file, &table, ChecksummedRead::full_file(64)).unwrap();
        assert_eq!(r.get().await.unwrap(), &bytes[..16]);
        r.pos = 17;

        let err = r.get().await.unwrap_err();
        assert_eq!(err.code(), crate::sstable::ReaderErrorCode::ReaderDesync);
        assert!(!err.is_fatal());
        assert!(err.message().contains("not aligned to chunk boundary: pos=17"));
        r.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_short_table_is_malformed() {
        let bytes = data(64);
        let full = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);
        let table = ChecksumTable::new(CHUNK, full.checksums()[..2].to_vec());
        let file = MemoryFile::new(bytes);

        let mut r = reader(&file, &table, ChecksummedRead::new(64, 40, 10)).unwrap();
        let err = r.get().await.unwrap_err();
        assert!(err.is_malformed());
        assert!(err.message().contains("no entry for chunk 2"));
    }

    #[tokio::test]
    async fn test_short_read_is_malformed() {
        let bytes = data(64);
        let table = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);
        // Caller claims a longer file than the source holds.
        let file = MemoryFile::new(bytes[..40].to_vec());

        let mut r = reader(&file, &table, ChecksummedRead::new(64, 32, 32)).unwrap();
        let err = r.get().await.unwrap_err();
        assert!(err.is_malformed());
        assert!(err.message().contains("Short read"));
    }

    #[tokio::test]
    async fn test_digest_valid_full_read() {
        let bytes = data(70);
        let file = MemoryFile::new(bytes.clone());
        let table = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);
        let slot = DigestSlot::new();

        let request = ChecksummedRead::full_file(70)
            .with_digest(Crc32Checksum::checksum(&bytes), slot.clone());
        let mut r = reader(&file, &table, request).unwrap();
        assert_eq!(slot.status(), Some(DigestStatus::InProgress));

        assert_eq!(drain(&mut r).await.unwrap(), bytes);
        assert_eq!(slot.status(), Some(DigestStatus::Valid));
    }

    #[tokio::test]
    async fn test_digest_partial_read_is_fatal() {
        let bytes = data(70);
        let file = MemoryFile::new(bytes.clone());
        let table = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);
        let slot = DigestSlot::new();

        let request = ChecksummedRead::new(70, 1, 69).with_digest(0, slot.clone());
        let err = reader(&file, &table, request).err().unwrap();
        assert!(err.is_fatal());
        assert!(slot.get().is_none());
    }

    #[tokio::test]
    async fn test_digest_without_slot_is_fatal() {
        let bytes = data(70);
        let file = MemoryFile::new(bytes.clone());
        let table = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);

        let request = ChecksummedRead::full_file(70).with_expected_digest(1);
        assert!(reader(&file, &table, request).err().unwrap().is_fatal());
    }

    #[tokio::test]
    async fn test_skip_then_get() {
        let bytes = data(100);
        let file = MemoryFile::new(bytes.clone());
        let table = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);

        let mut r = reader(&file, &table, ChecksummedRead::new(100, 3, 90)).unwrap();
        assert!(r.skip(30).await.unwrap().is_empty());
        assert_eq!(drain(&mut r).await.unwrap(), &bytes[33..93]);
    }

    #[tokio::test]
    async fn test_skip_to_end_returns_empty() {
        let bytes = data(100);
        let file = MemoryFile::new(bytes.clone());
        let table = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);

        let mut r = reader(&file, &table, ChecksummedRead::new(100, 0, 50)).unwrap();
        assert!(r.skip(50).await.unwrap().is_empty());
        assert!(r.get().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skip_past_end_is_fatal() {
        let bytes = data(100);
        let file = MemoryFile::new(bytes.clone());
        let table = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);

        let mut r = reader(&file, &table, ChecksummedRead::new(100, 0, 50)).unwrap();
        assert!(r.skip(51).await.unwrap_err().is_fatal());
        assert!(r.skip(u64::MAX).await.is_err());
    }

    #[tokio::test]
    async fn test_skip_with_digest_is_fatal() {
        let bytes = data(100);
        let file = MemoryFile::new(bytes.clone());
        let table = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);

        let request = ChecksummedRead::full_file(100).with_digest(0, DigestSlot::new());
        let mut r = reader(&file, &table, request).unwrap();
        assert!(r.skip(1).await.unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let bytes = data(100);
        let file = MemoryFile::new(bytes.clone());
        let table = ChecksumTable::compute::<Crc32Checksum>(&bytes, CHUNK);

        let mut r = reader(&file, &table, ChecksummedRead::full_file(100)).unwrap();
        assert!(r.is_open());
        r.close().await.unwrap();
        assert!(!r.is_open());
        r.close().await.unwrap();
        assert!(r.get().await.is_err());
    }
}
