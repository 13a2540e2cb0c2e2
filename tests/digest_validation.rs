//! Digest Validation and On-Disk Tests
//!
//! Tests for invariants:
//! - The digest slot is InProgress only for digest-checked reads
//! - The slot reaches a terminal state exactly once, at end of file
//! - A digest mismatch never fails the read
//! - Digest checking is restricted to full-file reads
//! - On-disk components (data, CRC, digest) read through tokio::fs::File

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sstable_checksummed::config::ReaderConfig;
use sstable_checksummed::sstable::{
    load_digest, make_checksummed_input_stream, ChecksumTable, ChecksummedRead, DigestSlot,
    DigestStatus, MemoryFile, SstableFormat, StreamOptions,
};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

const FORMATS: [SstableFormat; 2] = [SstableFormat::Legacy, SstableFormat::Current];

fn sample_data(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

fn full_read(file_len: u64) -> ChecksummedRead {
    ChecksummedRead::full_file(file_len).with_config(ReaderConfig::default())
}

/// Writes Data.db, CRC.db and Digest.* the way the on-disk format lays them out.
fn write_components(
    dir: &TempDir,
    format: SstableFormat,
    data: &[u8],
    chunk_size: u32,
) -> (std::path::PathBuf, std::path::PathBuf, std::path::PathBuf) {
    let table = format.compute_table(data, chunk_size);
    let mut crc = chunk_size.to_be_bytes().to_vec();
    for checksum in table.checksums() {
        crc.extend_from_slice(&checksum.to_be_bytes());
    }

    let data_path = dir.path().join("Data.db");
    let crc_path = dir.path().join("CRC.db");
    let digest_path = dir.path().join(format.digest_component());
    std::fs::write(&data_path, data).unwrap();
    std::fs::write(&crc_path, crc).unwrap();
    std::fs::write(&digest_path, format!("{}\n", format.digest(data))).unwrap();
    (data_path, crc_path, digest_path)
}

// =============================================================================
// Slot Transitions
// =============================================================================

/// The slot is InProgress until the last chunk, then terminal.
#[tokio::test]
async fn test_slot_in_progress_until_end_of_file() {
    for format in FORMATS {
        let data = sample_data(5_000, 1);
        let table = format.compute_table(&data, 1_024);
        let slot = DigestSlot::new();

        let mut input = make_checksummed_input_stream(
            format,
            MemoryFile::new(data.clone()),
            &table,
            full_read(5_000).with_digest(format.digest(&data), slot.clone()),
        )
        .unwrap();
        assert_eq!(slot.status(), Some(DigestStatus::InProgress));

        for _ in 0..4 {
            assert_eq!(input.read().await.unwrap().len(), 1_024);
            assert_eq!(slot.status(), Some(DigestStatus::InProgress));
        }
        assert_eq!(input.read().await.unwrap().len(), 904);
        assert_eq!(slot.status(), Some(DigestStatus::Valid), "{:?}", format);
        assert!(input.read().await.unwrap().is_empty());
        input.close().await.unwrap();
    }
}

/// A mismatch is reported through the slot; the read itself succeeds.
#[tokio::test]
async fn test_mismatch_reported_not_raised() {
    for format in FORMATS {
        let data = sample_data(3_000, 2);
        let table = format.compute_table(&data, 512);
        let slot = DigestSlot::new();
        let expected = format.digest(&data) ^ 0xFFFF_FFFF;

        let mut input = make_checksummed_input_stream(
            format,
            MemoryFile::new(data.clone()),
            &table,
            full_read(3_000).with_digest(expected, slot.clone()),
        )
        .unwrap();
        assert_eq!(input.read_to_end().await.unwrap(), data);

        let result = slot.get().unwrap();
        assert_eq!(result.status, DigestStatus::Invalid);
        let message = result.message.unwrap();
        assert!(message.contains(&format!("expected={}", expected)));
        assert!(message.contains(&format!("actual={}", format.digest(&data))));
    }
}

/// The mismatch handler runs exactly once, and only on mismatch.
#[tokio::test]
async fn test_mismatch_handler_runs_once() {
    let data = sample_data(2_048, 3);
    let format = SstableFormat::Current;
    let table = format.compute_table(&data, 256);

    for (expected, calls_expected) in [(format.digest(&data), 0), (0, 1)] {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let slot = DigestSlot::new().with_mismatch_handler(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let mut input = make_checksummed_input_stream(
            format,
            MemoryFile::new(data.clone()),
            &table,
            full_read(2_048).with_digest(expected, slot),
        )
        .unwrap();
        input.read_to_end().await.unwrap();
        input.read_to_end().await.unwrap();
        input.close().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), calls_expected);
    }
}

/// Reads without a digest never write the slot.
#[tokio::test]
async fn test_slot_untouched_without_digest() {
    let data = sample_data(2_048, 4);
    let table = SstableFormat::Current.compute_table(&data, 256);
    let slot = DigestSlot::new();

    let mut input = make_checksummed_input_stream(
        SstableFormat::Current,
        MemoryFile::new(data.clone()),
        &table,
        full_read(2_048).with_digest_slot(slot.clone()),
    )
    .unwrap();
    input.read_to_end().await.unwrap();
    assert!(slot.get().is_none());
}

/// A corrupt chunk fails the read and leaves the slot InProgress.
#[tokio::test]
async fn test_corrupt_chunk_leaves_slot_in_progress() {
    let mut data = sample_data(2_048, 5);
    let format = SstableFormat::Legacy;
    let table = format.compute_table(&data, 512);
    let digest = format.digest(&data);
    data[2_000] ^= 0x10;
    let slot = DigestSlot::new();

    let mut input = make_checksummed_input_stream(
        format,
        MemoryFile::new(data),
        &table,
        full_read(2_048).with_digest(digest, slot.clone()),
    )
    .unwrap();
    assert!(input.read_to_end().await.unwrap_err().is_malformed());
    assert_eq!(slot.status(), Some(DigestStatus::InProgress));
}

// =============================================================================
// Digest Restrictions
// =============================================================================

/// A digest check on anything but a full-file read is a caller defect.
#[tokio::test]
async fn test_partial_read_with_digest_is_fatal() {
    let data = sample_data(4_096, 6);
    let table = SstableFormat::Current.compute_table(&data, 1_024);

    for (offset, length) in [(1, 4_095), (0, 4_095), (1_024, 10_000)] {
        let slot = DigestSlot::new();
        let err = make_checksummed_input_stream(
            SstableFormat::Current,
            MemoryFile::new(data.clone()),
            &table,
            ChecksummedRead::new(4_096, offset, length)
                .with_config(ReaderConfig::default())
                .with_digest(0, slot.clone()),
        )
        .err()
        .unwrap();
        assert!(err.is_fatal(), "offset={} length={}", offset, length);
        assert!(err.message().contains("partial read"));
        assert!(slot.get().is_none());
    }
}

/// A digest without a slot is a caller defect.
#[tokio::test]
async fn test_digest_without_slot_is_fatal() {
    let data = sample_data(100, 7);
    let table = SstableFormat::Current.compute_table(&data, 64);
    let err = make_checksummed_input_stream(
        SstableFormat::Current,
        MemoryFile::new(data),
        &table,
        full_read(100).with_expected_digest(1),
    )
    .err()
    .unwrap();
    assert!(err.is_fatal());
}

/// Skipping is refused while a digest is being accumulated.
#[tokio::test]
async fn test_skip_with_digest_is_fatal() {
    let data = sample_data(100, 8);
    let table = SstableFormat::Current.compute_table(&data, 64);
    let mut input = make_checksummed_input_stream(
        SstableFormat::Current,
        MemoryFile::new(data.clone()),
        &table,
        full_read(100).with_digest(SstableFormat::Current.digest(&data), DigestSlot::new()),
    )
    .unwrap();
    let err = input.skip(10).await.unwrap_err();
    assert!(err.is_fatal());
    assert!(err.message().contains("digest check"));
}

// =============================================================================
// On-Disk Components
// =============================================================================

/// Data, CRC and digest files written to disk verify for both formats.
#[tokio::test]
async fn test_on_disk_full_verification() {
    for format in FORMATS {
        let dir = TempDir::new().unwrap();
        let data = sample_data(70_000, 9);
        let (data_path, crc_path, digest_path) = write_components(&dir, format, &data, 4_096);

        let table = ChecksumTable::load(&crc_path).await.unwrap();
        assert_eq!(table.len(), 18);
        let digest = load_digest(&digest_path).await.unwrap();
        let file = tokio::fs::File::open(&data_path).await.unwrap();
        let slot = DigestSlot::new();

        let mut input = make_checksummed_input_stream(
            format,
            file,
            &table,
            full_read(data.len() as u64)
                .with_options(StreamOptions { buffer_size: 1_000 })
                .with_digest(digest, slot.clone()),
        )
        .unwrap();
        assert_eq!(input.read_to_end().await.unwrap(), data);
        input.close().await.unwrap();
        assert_eq!(slot.status(), Some(DigestStatus::Valid), "{:?}", format);
    }
}

/// A range read from disk, consumed as a stream, after a skip.
#[tokio::test]
async fn test_on_disk_range_as_stream() {
    let dir = TempDir::new().unwrap();
    let format = SstableFormat::from_version("md").unwrap();
    let data = sample_data(20_000, 10);
    let (data_path, crc_path, _) = write_components(&dir, format, &data, 2_048);

    let table = ChecksumTable::load(&crc_path).await.unwrap();
    let file = tokio::fs::File::open(&data_path).await.unwrap();
    let mut input = make_checksummed_input_stream(
        format,
        file,
        &table,
        ChecksummedRead::new(20_000, 3_000, 12_000).with_config(ReaderConfig::default()),
    )
    .unwrap();
    input.skip(5_000).await.unwrap();

    let chunks: Vec<_> = input.into_stream().collect().await;
    let mut bytes = Vec::new();
    for chunk in chunks {
        bytes.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(bytes, &data[8_000..15_000]);
}

/// Corruption on disk is caught through the file-backed stream too.
#[tokio::test]
async fn test_on_disk_corruption_detected() {
    let dir = TempDir::new().unwrap();
    let format = SstableFormat::from_version("la").unwrap();
    let mut data = sample_data(9_000, 11);
    let (data_path, crc_path, _) = write_components(&dir, format, &data, 4_096);
    data[8_500] ^= 0x04;
    std::fs::write(&data_path, &data).unwrap();

    let table = ChecksumTable::load(&crc_path).await.unwrap();
    let file = tokio::fs::File::open(&data_path).await.unwrap();
    let mut input =
        make_checksummed_input_stream(format, file, &table, full_read(9_000)).unwrap();
    let err = input.read_to_end().await.unwrap_err();
    let failure = err.checksum_failure().unwrap();
    assert_eq!(failure.file_offset, 8_192);
    assert_eq!(failure.chunk_size, 808);
}
