//! Physical layout parameters of a message set

use serde::{Deserialize, Serialize};

use super::errors::{MessageSetError, MessageSetResult};

/// Default physical write unit.
pub const DEFAULT_PAGE_SIZE: usize = 512;

/// Default capacity growth step.
pub const DEFAULT_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Default batching threshold, kept below the chunk size so page rounding
/// of one batch never needs more than one extra increment.
pub const DEFAULT_BATCH_LIMIT: usize = 4 * 1024 * 1024 - 1024;

/// Page size, chunk increment and batching threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub page_size: usize,
    pub chunk_size: u64,
    pub batch_limit: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            batch_limit: DEFAULT_BATCH_LIMIT,
        }
    }
}

impl Geometry {
    /// Creates and validates a geometry.
    pub fn new(page_size: usize, chunk_size: u64, batch_limit: usize) -> MessageSetResult<Self> {
        let geometry = Self {
            page_size,
            chunk_size,
            batch_limit,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Checks the relations between the three sizes.
    pub fn validate(&self) -> MessageSetResult<()> {
        if self.page_size == 0 || !self.page_size.is_power_of_two() {
            return Err(MessageSetError::invalid(format!(
                "page_size must be a power of two, got {}",
                self.page_size
            )));
        }
        if self.chunk_size == 0 || self.chunk_size % self.page_size as u64 != 0 {
            return Err(MessageSetError::invalid(format!(
                "chunk_size must be a non-zero multiple of page_size {}, got {}",
                self.page_size, self.chunk_size
            )));
        }
        if self.batch_limit == 0 || self.batch_limit as u64 >= self.chunk_size {
            return Err(MessageSetError::invalid(format!(
                "batch_limit must be between 1 and chunk_size {}, got {}",
                self.chunk_size, self.batch_limit
            )));
        }
        Ok(())
    }

    /// Rounds `offset` down to a page boundary.
    pub fn page_floor(&self, offset: u64) -> u64 {
        let page = self.page_size as u64;
        offset - offset % page
    }

    /// Rounds `offset` up to a page boundary.
    pub fn page_ceil(&self, offset: u64) -> u64 {
        let page = self.page_size as u64;
        offset.div_ceil(page) * page
    }
}
