//! Store manifest
//!
//! Location: `<dir>/<name>.manifest.json`
//!
//! The page file does not know how much of it holds records. The manifest
//! records that, together with the geometry the file was written with and an
//! identity that changes whenever the log is recreated.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::durable;
use crate::messageset::Geometry;

use super::errors::{StoreError, StoreResult};

/// Current manifest format.
pub const MANIFEST_FORMAT_VERSION: u8 = 1;

/// Persistent description of one message set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u8,
    /// Identity of this log; offsets are only meaningful within one set.
    pub set_id: Uuid,
    pub page_size: usize,
    pub chunk_size: u64,
    /// Bytes of framed records; everything past it is unused capacity.
    pub content_size: u64,
    pub created_at: DateTime<Utc>,
}

impl Manifest {
    /// Manifest for a freshly created, empty log.
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            format_version: MANIFEST_FORMAT_VERSION,
            set_id: Uuid::new_v4(),
            page_size: geometry.page_size,
            chunk_size: geometry.chunk_size,
            content_size: 0,
            created_at: Utc::now(),
        }
    }

    /// Reads a manifest.
    pub fn load(path: &Path) -> StoreResult<Self> {
        durable::read_json(path).map_err(|e| StoreError::manifest(path.display().to_string(), e))
    }

    /// Atomically replaces the manifest on disk.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        durable::write_json_atomic(path, self)
            .map_err(|e| StoreError::manifest(path.display().to_string(), e))
    }

    /// Rejects a manifest written with a different page or chunk size.
    pub fn check_geometry(&self, geometry: &Geometry) -> StoreResult<()> {
        if self.page_size != geometry.page_size {
            return Err(StoreError::GeometryMismatch {
                field: "page_size",
                recorded: self.page_size as u64,
                configured: geometry.page_size as u64,
            });
        }
        if self.chunk_size != geometry.chunk_size {
            return Err(StoreError::GeometryMismatch {
                field: "chunk_size",
                recorded: self.chunk_size,
                configured: geometry.chunk_size,
            });
        }
        Ok(())
    }
}
