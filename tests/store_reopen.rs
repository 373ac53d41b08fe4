//! Store Reopen Tests
//!
//! The durable store as a process would see it across restarts:
//! - The manifest carries the content size from one session to the next
//! - Read-only handles replay what earlier sessions appended
//! - Projection checkpoints resume where the previous run stopped

use pagelog::checkpoint::{replay_batch, ProcessingInfo};
use pagelog::messageset::{Geometry, StorageOffset};
use pagelog::observability::{Logger, Severity};
use pagelog::staging::{StagingReader, StagingWriter};
use pagelog::store::{AppendOnlyStore, Manifest};
use std::path::Path;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn geometry() -> Geometry {
    Geometry::new(512, 8192, 2048).unwrap()
}

fn open(dir: &Path) -> AppendOnlyStore {
    AppendOnlyStore::open_or_create(dir, "events", geometry(), Logger::discard()).unwrap()
}

fn payloads(store: &AppendOnlyStore) -> Vec<(String, Vec<u8>)> {
    store
        .read_all(StorageOffset::ZERO, None, usize::MAX)
        .unwrap()
        .map(|r| r.map(|r| (r.stream_key, r.payload)))
        .collect::<Result<_, _>>()
        .unwrap()
}

// =============================================================================
// Content Size Across Sessions
// =============================================================================

/// Appends from several sessions accumulate in order.
#[test]
fn test_sessions_accumulate() {
    let temp = TempDir::new().unwrap();

    for session in 0u8..4 {
        let mut store = open(temp.path());
        store
            .append("orders", [vec![session; 10], vec![session; 700]])
            .unwrap();
    }

    let store = open(temp.path());
    let records = payloads(&store);
    assert_eq!(records.len(), 8);
    for (i, (key, payload)) in records.iter().enumerate() {
        assert_eq!(key, "orders");
        assert_eq!(payload[0], (i / 2) as u8);
    }
    assert_eq!(store.content_size(), 4 * (2 * (1 + 6 + 4) + 10 + 700));
}

/// The manifest on disk always matches the in-memory content size.
#[test]
fn test_manifest_tracks_every_append() {
    let temp = TempDir::new().unwrap();
    let mut store = open(temp.path());
    let manifest_path = store.paths().manifest.clone();

    for i in 0..5u32 {
        let size = store.append("ticks", [i.to_le_bytes()]).unwrap();
        assert_eq!(Manifest::load(&manifest_path).unwrap().content_size, size);
    }
}

/// Reopening keeps the identity recorded at creation.
#[test]
fn test_set_id_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let created = open(temp.path()).set_id();
    let reopened = open(temp.path()).set_id();
    assert_eq!(created, reopened);
}

/// A store opened with a different page size is refused.
#[test]
fn test_reopen_with_other_geometry_fails() {
    let temp = TempDir::new().unwrap();
    open(temp.path());

    let other = Geometry::new(1024, 8192, 2048).unwrap();
    let err = AppendOnlyStore::open(temp.path(), "events", other, Logger::discard()).unwrap_err();
    assert_eq!(err.code(), "PAGELOG_INVALID_ARGUMENT");
}

// =============================================================================
// Read-Only Handles
// =============================================================================

/// A read-only handle sees what was appended and rejects appends.
#[test]
fn test_read_only_handle() {
    let temp = TempDir::new().unwrap();
    {
        let mut store = open(temp.path());
        store.append("orders", [b"placed", b"billed"]).unwrap();
    }

    let (logger, capture) = Logger::capture(Severity::Info);
    let mut reader = AppendOnlyStore::read_only(temp.path(), "events", geometry(), logger).unwrap();
    assert_eq!(payloads(&reader).len(), 2);
    assert!(reader.append("orders", [b"shipped"]).is_err());

    let opened = capture.events("STORE_OPEN");
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0]["mode"], "read");
}

/// Replay never decodes the zero-filled capacity past the content size.
#[test]
fn test_replay_ignores_unused_capacity() {
    let temp = TempDir::new().unwrap();
    let mut store = open(temp.path());
    store.append("orders", [b"only"]).unwrap();

    let mut reader = store
        .read_all(StorageOffset::ZERO, None, usize::MAX)
        .unwrap();
    assert_eq!(reader.by_ref().count(), 1);
    assert!(reader.truncated_at().is_none());
    assert!(store.capacity() > store.content_size());
}

// =============================================================================
// Import And Projection
// =============================================================================

/// An imported staging file is followed in batches across restarts.
#[test]
fn test_import_then_follow_in_batches() {
    let temp = TempDir::new().unwrap();
    let staging_path = temp.path().join("bulk.staging");
    let mut writer = StagingWriter::create(&staging_path).unwrap();
    for i in 0..25u16 {
        writer.write(&i.to_be_bytes()).unwrap();
    }
    writer.finish().unwrap();

    {
        let mut store = open(temp.path());
        let stats = store
            .import("bulk", StagingReader::open(&staging_path).unwrap())
            .unwrap();
        assert_eq!(stats.records, 25);
    }

    let checkpoint = temp.path().join("projection.info");
    let mut seen = Vec::new();
    loop {
        let store =
            AppendOnlyStore::read_only(temp.path(), "events", geometry(), Logger::discard())
                .unwrap();
        let mut info = ProcessingInfo::load_or_default(&checkpoint).unwrap();
        let outcome = replay_batch(&store, &mut info, 10, |record| {
            seen.push(u16::from_be_bytes([record.payload[0], record.payload[1]]));
            true
        })
        .unwrap();
        info.save(&checkpoint).unwrap();
        if outcome.is_empty() {
            break;
        }
    }

    assert_eq!(seen, (0..25).collect::<Vec<u16>>());
    let info = ProcessingInfo::load_or_default(&checkpoint).unwrap();
    assert_eq!(info.events_processed, 25);
}

/// A reset log restarts projections from its first record.
#[test]
fn test_reset_invalidates_checkpoints() {
    let temp = TempDir::new().unwrap();
    let mut store = open(temp.path());
    store.append("orders", [vec![1u8; 5], vec![2u8; 5]]).unwrap();

    let mut info = ProcessingInfo::default();
    replay_batch(&store, &mut info, 10, |_| true).unwrap();
    assert_eq!(info.next_offset, StorageOffset::new(store.content_size()));
    let old_set = info.set_id;

    store.reset().unwrap();
    store.append("zz", [vec![9u8; 40]]).unwrap();

    let mut seen = Vec::new();
    let outcome = replay_batch(&store, &mut info, 10, |record| {
        seen.push(record.stream_key.clone());
        true
    })
    .unwrap();

    assert_ne!(info.set_id, old_set);
    assert_eq!(outcome.records, 1);
    assert_eq!(seen, vec!["zz"]);
    assert_eq!(info.next_offset, StorageOffset::new(store.content_size()));
    assert_eq!(info.events_processed, 1);
}
