//! Byte-stream sources
//!
//! A [`DataFile`] opens one pull-based [`ByteStream`] over a byte window of
//! the data file. The checksummed reader only ever asks for whole chunks,
//! skips forward, and closes.
//!
//! Two sources are provided:
//! - `tokio::fs::File`: buffered, seeks lazily so a skip costs no I/O
//! - [`MemoryFile`]: shared in-memory bytes

use std::future::Future;
use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, BufReader};

use crate::config::ReaderConfig;

/// Boxed future returned by stream operations
pub type IoFuture<'a, T> = Pin<Box<dyn Future<Output = io::Result<T>> + Send + 'a>>;

/// Options for opening a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Read buffer capacity in bytes
    pub buffer_size: usize,
}

impl StreamOptions {
    /// Options taken from a reader configuration
    pub fn from_config(config: &ReaderConfig) -> Self {
        Self {
            buffer_size: config.buffer_size,
        }
    }
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self::from_config(ReaderConfig::global())
    }
}

/// Sequential byte stream over a window of a file.
pub trait ByteStream: Send {
    /// Reads `n` bytes.
    ///
    /// Returns fewer only when the window or the file ends first; an empty
    /// buffer means end of stream.
    fn read_exactly(&mut self, n: usize) -> IoFuture<'_, Vec<u8>>;

    /// Discards the next `n` bytes of the window.
    fn skip(&mut self, n: u64) -> IoFuture<'_, ()>;

    /// Releases the stream. Reads after close fail.
    fn close(&mut self) -> IoFuture<'_, ()>;
}

/// A data file that can open one stream over a byte window.
pub trait DataFile: Send {
    type Stream: ByteStream;

    /// Opens a stream over `[start, start + len)`.
    ///
    /// The window may extend past the end of the file.
    fn open_stream(self, start: u64, len: u64, options: StreamOptions) -> Self::Stream;
}

fn closed_stream() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "stream is closed")
}

// =============================================================================
// tokio::fs::File
// =============================================================================

/// Buffered stream over a `tokio::fs::File`.
///
/// Skips inside the read buffer consume it; longer skips defer a seek to
/// the next read, so skipping never touches the file.
#[derive(Debug)]
pub struct FileInputStream {
    reader: Option<BufReader<File>>,
    pending_seek: Option<u64>,
    position: u64,
    remaining: u64,
}

impl FileInputStream {
    /// Wraps `file`, positioned lazily at `start`
    pub fn new(file: File, start: u64, len: u64, options: StreamOptions) -> Self {
        Self {
            reader: Some(BufReader::with_capacity(options.buffer_size.max(1), file)),
            pending_seek: Some(start),
            position: start,
            remaining: len,
        }
    }

    /// Absolute file position of the next byte
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl ByteStream for FileInputStream {
    fn read_exactly(&mut self, n: usize) -> IoFuture<'_, Vec<u8>> {
        Box::pin(async move {
            let pending_seek = self.pending_seek.take();
            let reader = self.reader.as_mut().ok_or_else(closed_stream)?;
            if let Some(pos) = pending_seek {
                reader.seek(SeekFrom::Start(pos)).await?;
            }

            let want = usize::try_from(self.remaining).map_or(n, |r| r.min(n));
            let mut buf = vec![0u8; want];
            let mut filled = 0;
            while filled < want {
                let read = reader.read(&mut buf[filled..]).await?;
                if read == 0 {
                    break;
                }
                filled += read;
            }
            buf.truncate(filled);

            self.position += filled as u64;
            self.remaining -= filled as u64;
            Ok(buf)
        })
    }

    fn skip(&mut self, n: u64) -> IoFuture<'_, ()> {
        Box::pin(async move {
            let reader = self.reader.as_mut().ok_or_else(closed_stream)?;
            let n = n.min(self.remaining);
            if n == 0 {
                return Ok(());
            }
            self.position += n;
            self.remaining -= n;
            if self.pending_seek.is_none() && n <= reader.buffer().len() as u64 {
                reader.consume(n as usize);
            } else {
                self.pending_seek = Some(self.position);
            }
            Ok(())
        })
    }

    fn close(&mut self) -> IoFuture<'_, ()> {
        Box::pin(async move {
            self.reader.take();
            Ok(())
        })
    }
}

impl DataFile for File {
    type Stream = FileInputStream;

    fn open_stream(self, start: u64, len: u64, options: StreamOptions) -> FileInputStream {
        FileInputStream::new(self, start, len, options)
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Data file held in memory.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    data: Arc<[u8]>,
}

impl MemoryFile {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    /// File length in bytes
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Full file content
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Stream over a [`MemoryFile`] window
#[derive(Debug)]
pub struct MemoryStream {
    data: Arc<[u8]>,
    position: usize,
    end: usize,
    closed: bool,
}

impl MemoryStream {
    fn new(data: Arc<[u8]>, start: u64, len: u64) -> Self {
        let file_len = data.len();
        let clamp = |v: u64| usize::try_from(v).map_or(file_len, |v| v.min(file_len));
        let position = clamp(start);
        let end = clamp(start.saturating_add(len)).max(position);
        Self {
            data,
            position,
            end,
            closed: false,
        }
    }
}

impl ByteStream for MemoryStream {
    fn read_exactly(&mut self, n: usize) -> IoFuture<'_, Vec<u8>> {
        Box::pin(async move {
            if self.closed {
                return Err(closed_stream());
            }
            let take = n.min(self.end - self.position);
            let buf = self.data[self.position..self.position + take].to_vec();
            self.position += take;
            Ok(buf)
        })
    }

    fn skip(&mut self, n: u64) -> IoFuture<'_, ()> {
        Box::pin(async move {
            if self.closed {
                return Err(closed_stream());
            }
            let left = self.end - self.position;
            let n = usize::try_from(n).map_or(left, |n| n.min(left));
            self.position += n;
            Ok(())
        })
    }

    fn close(&mut self) -> IoFuture<'_, ()> {
        Box::pin(async move {
            self.closed = true;
            Ok(())
        })
    }
}

impl DataFile for MemoryFile {
    type Stream = MemoryStream;

    fn open_stream(self, start: u64, len: u64, _options: StreamOptions) -> MemoryStream {
        MemoryStream::new(self.data, start, len)
    }
}
