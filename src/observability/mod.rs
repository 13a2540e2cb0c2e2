//! Observability for the checksummed reader
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle and integrity events
//!
//! # Principles
//!
//! 1. Observability is read-only: logging never changes reader behaviour
//! 2. No async or background threads
//! 3. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use sstable_checksummed::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::DigestMismatch, &[("expected", "1"), ("actual", "2")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a reader event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a reader event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
