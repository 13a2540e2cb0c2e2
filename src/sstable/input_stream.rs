//! Consumer-facing input stream
//!
//! Wraps a [`DataSource`] with a carry-over buffer so callers can read
//! arbitrary amounts instead of whole chunks.

use futures_util::stream::{self, Stream};

use super::errors::ReaderResult;
use super::reader::DataSource;

/// Buffered reader over a checksummed data source.
pub struct InputStream<'t> {
    source: Box<dyn DataSource + 't>,
    buffer: Vec<u8>,
    consumed: usize,
    eof: bool,
}

/// State of [`InputStream::into_stream`]
enum StreamState<'t> {
    Reading(InputStream<'t>),
    Done,
}

impl<'t> InputStream<'t> {
    pub fn new(source: Box<dyn DataSource + 't>) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            consumed: 0,
            eof: false,
        }
    }

    fn buffered(&self) -> usize {
        self.buffer.len() - self.consumed
    }

    fn take_buffered(&mut self, max: usize) -> Vec<u8> {
        let n = max.min(self.buffered());
        let out = self.buffer[self.consumed..self.consumed + n].to_vec();
        self.consumed += n;
        if self.consumed == self.buffer.len() {
            self.buffer.clear();
            self.consumed = 0;
        }
        out
    }

    /// Next non-empty buffer, or an empty one at end of stream.
    pub async fn read(&mut self) -> ReaderResult<Vec<u8>> {
        if self.buffered() > 0 {
            if self.consumed == 0 {
                return Ok(std::mem::take(&mut self.buffer));
            }
            return Ok(self.take_buffered(usize::MAX));
        }
        if self.eof {
            return Ok(Vec::new());
        }
        let buf = self.source.get().await?;
        if buf.is_empty() {
            self.eof = true;
        }
        Ok(buf)
    }

    /// Reads `n` bytes; fewer only at end of stream.
    pub async fn read_exactly(&mut self, n: usize) -> ReaderResult<Vec<u8>> {
        let mut out = self.take_buffered(n);
        while out.len() < n && !self.eof {
            let buf = self.source.get().await?;
            if buf.is_empty() {
                self.eof = true;
                break;
            }
            let need = n - out.len();
            if buf.len() <= need {
                out.extend_from_slice(&buf);
            } else {
                out.extend_from_slice(&buf[..need]);
                self.buffer = buf;
                self.consumed = need;
            }
        }
        Ok(out)
    }

    /// Reads everything up to end of stream.
    pub async fn read_to_end(&mut self) -> ReaderResult<Vec<u8>> {
        let mut out = self.take_buffered(usize::MAX);
        while !self.eof {
            let buf = self.source.get().await?;
            if buf.is_empty() {
                self.eof = true;
            } else {
                out.extend_from_slice(&buf);
            }
        }
        Ok(out)
    }

    /// Discards `n` bytes, consuming buffered data first.
    pub async fn skip(&mut self, n: u64) -> ReaderResult<()> {
        let from_buffer = usize::try_from(n).map_or(self.buffered(), |n| n.min(self.buffered()));
        self.take_buffered(from_buffer);
        let rest = n - from_buffer as u64;
        if rest > 0 {
            self.source.skip(rest).await?;
        }
        Ok(())
    }

    /// Closes the underlying source. Safe to call more than once.
    pub async fn close(&mut self) -> ReaderResult<()> {
        self.buffer.clear();
        self.consumed = 0;
        self.source.close().await
    }

    /// Buffers as a stream; the source is closed at end of stream.
    ///
    /// The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = ReaderResult<Vec<u8>>> + Send + 't {
        stream::unfold(StreamState::Reading(self), |state| async move {
            match state {
                StreamState::Done => None,
                StreamState::Reading(mut input) => match input.read().await {
                    Ok(buf) if buf.is_empty() => match input.close().await {
                        Ok(()) => None,
                        Err(e) => Some((Err(e), StreamState::Done)),
                    },
                    Ok(buf) => Some((Ok(buf), StreamState::Reading(input))),
                    Err(e) => {
                        // Close failures after a read error are not reported.
                        let _ = input.close().await;
                        Some((Err(e), StreamState::Done))
                    }
                },
            }
        })
    }
}
