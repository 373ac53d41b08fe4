//! Storage offsets and retrieved records

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque byte position into the logical content stream.
///
/// Produced by appends and consumed by replay as a resumption point.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StorageOffset(u64);

impl StorageOffset {
    /// Start of the log.
    pub const ZERO: StorageOffset = StorageOffset(0);

    pub fn new(offset_in_bytes: u64) -> Self {
        Self(offset_in_bytes)
    }

    /// Position in bytes.
    pub fn offset_in_bytes(&self) -> u64 {
        self.0
    }
}

impl From<u64> for StorageOffset {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for StorageOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A decoded record together with the offset to resume from after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedRecord {
    pub stream_key: String,
    pub payload: Vec<u8>,
    pub next: StorageOffset,
}
