//! sstable-checksummed - integrity-checked reads of uncompressed SSTable data
//!
//! A data file is read chunk by chunk; every chunk is validated against the
//! checksum component before any of its bytes reach the caller, and a
//! full-file read may also validate the whole-file digest.
//!
//! - [`checksum`]: Adler-32 (legacy formats) and CRC-32 (current formats)
//! - [`sstable`]: chunk geometry, checksum table, reader, input stream
//! - [`config`]: reader configuration
//! - [`observability`]: structured JSON-lines logging

pub mod checksum;
pub mod config;
pub mod observability;
pub mod sstable;
