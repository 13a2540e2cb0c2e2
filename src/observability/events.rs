//! Observable reader events
//!
//! Events are explicit and typed; each carries its own severity.

use std::fmt;

use super::logger::Severity;

/// Observable events of the checksummed reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Environment configuration rejected, defaults in use
    ConfigInvalid,

    // Reader lifecycle
    /// Underlying stream opened over an aligned window
    ReaderOpened,
    /// Underlying stream closed
    ReaderClosed,

    // Integrity
    /// A chunk failed its stored checksum
    ChunkChecksumMismatch,
    /// Reader position left chunk alignment, or reader used after failure
    ReaderDesync,
    /// Whole-file digest matched
    DigestValid,
    /// Whole-file digest did not match
    DigestMismatch,

    // Invariants
    /// Internal invariant violated (FATAL)
    InternalError,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigInvalid => "SSTABLE_CONFIG_INVALID",
            Event::ReaderOpened => "SSTABLE_READER_OPENED",
            Event::ReaderClosed => "SSTABLE_READER_CLOSED",
            Event::ChunkChecksumMismatch => "SSTABLE_CHUNK_CHECKSUM_MISMATCH",
            Event::ReaderDesync => "SSTABLE_READER_DESYNC",
            Event::DigestValid => "SSTABLE_DIGEST_VALID",
            Event::DigestMismatch => "SSTABLE_DIGEST_MISMATCH",
            Event::InternalError => "SSTABLE_INTERNAL_ERROR",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::ReaderOpened | Event::ReaderClosed => Severity::Trace,
            Event::DigestValid => Severity::Info,
            Event::ConfigInvalid | Event::DigestMismatch => Severity::Warn,
            Event::ChunkChecksumMismatch | Event::ReaderDesync => Severity::Error,
            Event::InternalError => Severity::Fatal,
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
