//! Error types for the checksummed SSTable reader
//!
//! Error codes:
//! - SSTABLE_INTERNAL_ERROR (FATAL severity) - caller or programming defect
//! - SSTABLE_MALFORMED (ERROR severity) - on-disk integrity violation
//! - SSTABLE_READER_DESYNC (ERROR severity) - reader misuse or poisoned state
//! - SSTABLE_READ_FAILED (ERROR severity) - underlying I/O failure

use std::fmt;
use std::io;

use crate::config::ReaderConfig;
use crate::observability::{log_event_with_fields, Event};

/// Severity of a reader error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The read fails, the caller decides what to do with the file
    Error,
    /// An invariant was broken; the operation cannot be recovered
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Reader error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderErrorCode {
    /// Internal invariant violated (bad chunk size, out-of-bounds skip, ...)
    InternalError,
    /// Checksum mismatch, short read or incomplete checksum table
    Malformed,
    /// Position desynchronized from chunk boundaries, or reader unusable
    ReaderDesync,
    /// Underlying stream failed
    ReadFailed,
}

impl ReaderErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ReaderErrorCode::InternalError => "SSTABLE_INTERNAL_ERROR",
            ReaderErrorCode::Malformed => "SSTABLE_MALFORMED",
            ReaderErrorCode::ReaderDesync => "SSTABLE_READER_DESYNC",
            ReaderErrorCode::ReadFailed => "SSTABLE_READ_FAILED",
        }
    }

    /// Returns the severity level for this code
    pub fn severity(&self) -> Severity {
        match self {
            ReaderErrorCode::InternalError => Severity::Fatal,
            ReaderErrorCode::Malformed => Severity::Error,
            ReaderErrorCode::ReaderDesync => Severity::Error,
            ReaderErrorCode::ReadFailed => Severity::Error,
        }
    }
}

impl fmt::Display for ReaderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Diagnostic context of a failed chunk checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumFailure {
    /// Number of bytes actually checksummed
    pub chunk_size: usize,
    /// Offset of the chunk in the data file
    pub file_offset: u64,
    /// Value stored in the checksum table
    pub expected: u32,
    /// Value computed over the bytes read
    pub actual: u32,
}

/// Reader error with code, message and optional context
#[derive(Debug)]
pub struct ReaderError {
    code: ReaderErrorCode,
    message: String,
    details: Option<String>,
    checksum_failure: Option<ChecksumFailure>,
    source: Option<io::Error>,
}

impl ReaderError {
    fn new(code: ReaderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            checksum_failure: None,
            source: None,
        }
    }

    /// Create an internal invariant error without logging it.
    ///
    /// Reader code goes through [`on_internal_error`], which also logs and
    /// honours `abort_on_internal_error`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ReaderErrorCode::InternalError, message)
    }

    /// Create a malformed-data error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ReaderErrorCode::Malformed, message)
    }

    /// Create a malformed-data error located at a file offset
    pub fn malformed_at_offset(file_offset: u64, message: impl Into<String>) -> Self {
        let mut err = Self::malformed(message);
        err.details = Some(format!("file_offset: {}", file_offset));
        err
    }

    /// Create a chunk checksum mismatch error
    pub fn checksum_mismatch(failure: ChecksumFailure) -> Self {
        let mut err = Self::malformed_at_offset(
            failure.file_offset,
            format!(
                "Checksummed chunk of size {} at file offset {} failed checksum: expected={}, actual={}",
                failure.chunk_size, failure.file_offset, failure.expected, failure.actual
            ),
        );
        err.checksum_failure = Some(failure);
        err
    }

    /// Create a desynchronization error
    pub fn desync(message: impl Into<String>) -> Self {
        Self::new(ReaderErrorCode::ReaderDesync, message)
    }

    /// Create an I/O failure error
    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        let mut err = Self::new(ReaderErrorCode::ReadFailed, message);
        err.source = Some(source);
        err
    }

    /// Returns the error code
    pub fn code(&self) -> ReaderErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns the checksum mismatch context, if this is one
    pub fn checksum_failure(&self) -> Option<&ChecksumFailure> {
        self.checksum_failure.as_ref()
    }

    /// Returns whether this error is an invariant violation
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Returns whether this error reports on-disk corruption
    pub fn is_malformed(&self) -> bool {
        self.code == ReaderErrorCode::Malformed
    }
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ReaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for reader operations
pub type ReaderResult<T> = Result<T, ReaderError>;

/// Reports an internal invariant violation.
///
/// Logs at FATAL, then either aborts the process (when
/// `abort_on_internal_error` is set) or returns the error for the caller to
/// propagate.
pub fn on_internal_error(config: &ReaderConfig, message: impl Into<String>) -> ReaderError {
    let message = message.into();
    log_event_with_fields(Event::InternalError, &[("message", message.as_str())]);
    if config.abort_on_internal_error {
        eprintln!("[ABORT] {}", message);
        std::process::abort();
    }
    ReaderError::internal(message)
}
