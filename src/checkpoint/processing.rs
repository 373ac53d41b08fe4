//! Projection processing checkpoint
//!
//! A projection consumes the log in bounded batches and remembers where to
//! resume in a small JSON file next to its view:
//!
//! ```json
//! {
//!   "set_id": "6f1c...",
//!   "next_offset": 4096,
//!   "last_offset": 2048,
//!   "events_processed": 120,
//!   "processed_at": "2026-01-01T00:00:00Z"
//! }
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::durable;
use crate::messageset::{RetrievedRecord, StorageOffset};
use crate::store::AppendOnlyStore;

use super::errors::{CheckpointError, CheckpointResult};

/// Default number of records read per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Resumption state of one projection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingInfo {
    /// Log the offsets belong to; `None` before the first batch.
    #[serde(default)]
    pub set_id: Option<Uuid>,
    /// Offset the next batch starts from.
    #[serde(default)]
    pub next_offset: StorageOffset,
    /// Offset the last batch started from.
    #[serde(default)]
    pub last_offset: StorageOffset,
    /// Records the projection counted as processed.
    #[serde(default)]
    pub events_processed: u64,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
}

impl ProcessingInfo {
    /// Loads the checkpoint at `path`, or a fresh one if it does not exist.
    pub fn load_or_default(path: &Path) -> CheckpointResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        durable::read_json(path).map_err(|e| CheckpointError::io(path.display().to_string(), e))
    }

    /// Atomically writes the checkpoint to `path`.
    pub fn save(&self, path: &Path) -> CheckpointResult<()> {
        durable::write_json_atomic(path, self)
            .map_err(|e| CheckpointError::io(path.display().to_string(), e))
    }

    /// Binds the checkpoint to `set_id`. Returns `true` if it was reset
    /// because it belonged to a different log.
    pub fn bind(&mut self, set_id: Uuid) -> bool {
        match self.set_id {
            Some(current) if current == set_id => false,
            Some(_) => {
                *self = Self {
                    set_id: Some(set_id),
                    ..Self::default()
                };
                true
            }
            None => {
                self.set_id = Some(set_id);
                false
            }
        }
    }
}

/// Result of one replay batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Records read from the log.
    pub records: usize,
    /// Records `handle` reported as processed.
    pub processed: usize,
}

impl BatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

/// Reads at most `max_records` from `info.next_offset` and feeds them to
/// `handle`, advancing `info` past every record seen.
///
/// `handle` returns whether the record counts towards `events_processed`.
/// The checkpoint is not saved; callers persist it once their view is
/// written.
pub fn replay_batch<F>(
    store: &AppendOnlyStore,
    info: &mut ProcessingInfo,
    max_records: usize,
    mut handle: F,
) -> CheckpointResult<BatchOutcome>
where
    F: FnMut(&RetrievedRecord) -> bool,
{
    info.bind(store.set_id());
    info.last_offset = info.next_offset;
    info.processed_at = Some(Utc::now());

    let mut outcome = BatchOutcome::default();
    for record in store.read_all(info.next_offset, None, max_records)? {
        let record = record?;
        info.next_offset = record.next;
        outcome.records += 1;
        if handle(&record) {
            info.events_processed += 1;
            outcome.processed += 1;
        }
    }
    Ok(outcome)
}
