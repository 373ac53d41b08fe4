//! # Page Store Trait

use std::fmt;
use std::io::Read;

use super::errors::{PageStoreError, PageStoreResult};

/// A remote, page-oriented blob.
///
/// All writes start on a page boundary and cover whole pages, and may only
/// land inside the currently allocated capacity. Capacity is extended
/// explicitly with [`PageStore::grow`] and never shrinks.
///
/// Methods take `&self`: one handle is shared by the single writer and any
/// number of readers. Timeouts are the implementation's concern.
pub trait PageStore: Send + Sync + fmt::Debug {
    /// Physical write unit in bytes.
    fn page_size(&self) -> usize;

    /// Writes whole pages starting at `offset`.
    fn write_pages(&self, offset: u64, data: &[u8]) -> PageStoreResult<()>;

    /// Reads `length` bytes starting at `offset`.
    fn read_range(&self, offset: u64, length: usize) -> PageStoreResult<Vec<u8>>;

    /// Extends allocated capacity to `new_capacity`.
    ///
    /// A no-op when capacity already covers `new_capacity`. Existing bytes
    /// are never moved or modified.
    fn grow(&self, new_capacity: u64) -> PageStoreResult<()>;

    /// Currently allocated capacity in bytes.
    fn capacity(&self) -> PageStoreResult<u64>;

    /// Opens an independent sequential read handle positioned at `offset`.
    ///
    /// The handle ends at the capacity observed when it was opened.
    fn open_read(&self, offset: u64) -> PageStoreResult<Box<dyn Read + Send>>;
}

/// Validates a page size: non-zero power of two.
pub fn check_page_size(page_size: usize) -> PageStoreResult<()> {
    if page_size == 0 || !page_size.is_power_of_two() {
        return Err(PageStoreError::InvalidPageSize(page_size));
    }
    Ok(())
}

/// Validates a physical write against alignment and capacity.
pub fn check_write(
    page_size: usize,
    capacity: u64,
    offset: u64,
    length: usize,
) -> PageStoreResult<()> {
    let page = page_size as u64;
    let length = length as u64;
    if offset % page != 0 || length % page != 0 {
        return Err(PageStoreError::Misaligned {
            offset,
            length,
            page_size,
        });
    }
    check_range(capacity, offset, length)
}

/// Validates that `[offset, offset + length)` lies within `capacity`.
pub fn check_range(capacity: u64, offset: u64, length: u64) -> PageStoreResult<()> {
    match offset.checked_add(length) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(PageStoreError::OutOfRange {
            offset,
            length,
            capacity,
        }),
    }
}
