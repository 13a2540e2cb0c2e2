//! Whole-file digest validation
//!
//! A full-file read may validate the data file against the value stored in
//! the digest component (`*-Digest.crc32` / `*-Digest.adler32`). The result
//! is reported out of band through a [`DigestSlot`] owned by the caller,
//! never as a read error: a digest mismatch is for the caller to adjudicate,
//! while a bad chunk fails the read immediately.

use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::checksum::ChecksumAlgorithm;
use crate::observability::{log_event_with_fields, Event};

use super::checksum_table::{ChecksumTableError, ChecksumTableResult};

/// Digest validation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestStatus {
    /// The file digest did not match
    Invalid = 0,
    /// The file digest matched
    Valid = 1,
    /// A digest-checked read is under way
    InProgress = 2,
}

/// Outcome of a digest-checked read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestValidationResult {
    pub status: DigestStatus,
    pub message: Option<String>,
}

impl DigestValidationResult {
    /// Read started, not yet finished
    pub fn in_progress() -> Self {
        Self {
            status: DigestStatus::InProgress,
            message: None,
        }
    }

    /// Digest matched
    pub fn valid() -> Self {
        Self {
            status: DigestStatus::Valid,
            message: None,
        }
    }

    /// Digest did not match
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            status: DigestStatus::Invalid,
            message: Some(message.into()),
        }
    }

    /// Whether the status is final
    pub fn is_terminal(&self) -> bool {
        self.status != DigestStatus::InProgress
    }
}

/// Callback told about a digest mismatch, with the mismatch message.
pub type IntegrityErrorHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Caller-owned output cell for a digest-checked read.
///
/// Clones share the same cell. The reader writes it at most twice:
/// `InProgress` when constructed, then a terminal status when the read
/// reaches the end of the file. Callers should only inspect it after the
/// reader has returned end-of-stream or been closed.
#[derive(Clone, Default)]
pub struct DigestSlot {
    result: Arc<Mutex<Option<DigestValidationResult>>>,
    on_mismatch: Option<IntegrityErrorHandler>,
}

impl DigestSlot {
    /// Creates an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Also invoke `handler` when the digest finalizes as invalid
    pub fn with_mismatch_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_mismatch = Some(Arc::new(handler));
        self
    }

    /// Current content; `None` if the reader never wrote it
    pub fn get(&self) -> Option<DigestValidationResult> {
        self.lock().clone()
    }

    /// Current status; `None` if the reader never wrote it
    pub fn status(&self) -> Option<DigestStatus> {
        self.lock().as_ref().map(|r| r.status)
    }

    pub(crate) fn set(&self, result: DigestValidationResult) {
        if result.status == DigestStatus::Invalid {
            if let (Some(handler), Some(message)) = (&self.on_mismatch, &result.message) {
                handler(message);
            }
        }
        *self.lock() = Some(result);
    }

    fn lock(&self) -> MutexGuard<'_, Option<DigestValidationResult>> {
        // The cell holds plain data, so a poisoned lock is still consistent.
        match self.result.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl fmt::Debug for DigestSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestSlot")
            .field("result", &self.get())
            .field("on_mismatch", &self.on_mismatch.is_some())
            .finish()
    }
}

/// Running whole-file digest of a checked read.
#[derive(Debug)]
pub struct DigestAccumulator<C> {
    expected: u32,
    actual: u32,
    _algorithm: PhantomData<fn() -> C>,
}

impl<C: ChecksumAlgorithm> DigestAccumulator<C> {
    /// Starts accumulating towards `expected`
    pub fn new(expected: u32) -> Self {
        Self {
            expected,
            actual: C::init(),
            _algorithm: PhantomData,
        }
    }

    /// Folds the next chunk in
    pub fn update(&mut self, chunk_checksum: u32, chunk: &[u8]) {
        self.actual = C::combine_or_feed(self.actual, chunk_checksum, chunk);
    }

    /// Digest of everything folded in so far
    pub fn actual(&self) -> u32 {
        self.actual
    }

    /// Value the digest is validated against
    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Terminal result for the slot
    pub fn finish(&self) -> DigestValidationResult {
        if self.expected == self.actual {
            log_event_with_fields(Event::DigestValid, &[("algorithm", C::NAME)]);
            DigestValidationResult::valid()
        } else {
            let message = format!(
                "Digest mismatch: expected={}, actual={}",
                self.expected, self.actual
            );
            log_event_with_fields(
                Event::DigestMismatch,
                &[("algorithm", C::NAME), ("message", message.as_str())],
            );
            DigestValidationResult::invalid(message)
        }
    }
}

/// Parses the content of a digest component: one decimal `u32`.
pub fn parse_digest(text: &str) -> ChecksumTableResult<u32> {
    let trimmed = text.trim();
    trimmed
        .parse::<u32>()
        .map_err(|_| ChecksumTableError::InvalidDigest(trimmed.to_string()))
}

/// Reads and parses a digest component file.
pub async fn load_digest(path: &Path) -> ChecksumTableResult<u32> {
    let text = tokio::fs::read_to_string(path).await?;
    parse_digest(&text)
}
