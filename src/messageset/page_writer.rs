//! Page-aligned write buffer
//!
//! The backing store only accepts whole pages. The writer keeps the bytes of
//! the last partially filled page in memory so that the next flush can
//! rewrite that page with its true prefix instead of zeros.
//!
//! ```text
//!   buffer_start (page aligned)
//!   |
//!   v
//!   [ durable tail | staged bytes ............ ]
//!   |<-durable_len->|
//! ```
//!
//! A flush writes `buffer` padded with zeros up to the next page boundary.
//! Padding only ever covers bytes past the logical end, which hold nothing.

use super::errors::{MessageSetError, MessageSetResult};
use super::geometry::Geometry;

/// Stages appended bytes and emits page-aligned physical writes.
#[derive(Debug)]
pub struct PageWriter {
    geometry: Geometry,
    /// Store offset of `buffer[0]`; always page aligned.
    buffer_start: u64,
    /// Durable trailing-page prefix followed by staged bytes.
    buffer: Vec<u8>,
    /// Length of the durable prefix of `buffer`.
    durable_len: usize,
}

impl PageWriter {
    /// Creates a writer positioned at offset zero.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            buffer_start: 0,
            buffer: Vec::new(),
            durable_len: 0,
        }
    }

    /// Logical offset the next `write` must start at.
    pub fn position(&self) -> u64 {
        self.buffer_start + self.buffer.len() as u64
    }

    /// Logical offset up to which bytes have been flushed.
    pub fn flushed_position(&self) -> u64 {
        self.buffer_start + self.durable_len as u64
    }

    /// Number of bytes staged but not yet flushed.
    pub fn staged_len(&self) -> usize {
        self.buffer.len() - self.durable_len
    }

    /// Loads the true contents of the page containing `offset` and positions
    /// the writer at `offset`.
    ///
    /// Must be called when resuming appends at a non-zero offset. `fetch`
    /// receives `(page_start, length)` and must return exactly `length`
    /// bytes; it is not called when `offset` is page aligned.
    pub fn cache_trailing_page<F>(&mut self, offset: u64, fetch: F) -> MessageSetResult<()>
    where
        F: FnOnce(u64, usize) -> MessageSetResult<Vec<u8>>,
    {
        let page_start = self.geometry.page_floor(offset);
        let length = (offset - page_start) as usize;

        let tail = if length > 0 {
            let bytes = fetch(page_start, length)?;
            if bytes.len() != length {
                return Err(MessageSetError::invalid(format!(
                    "trailing page fetch returned {} bytes, expected {}",
                    bytes.len(),
                    length
                )));
            }
            bytes
        } else {
            Vec::new()
        };

        self.buffer_start = page_start;
        self.buffer = tail;
        self.durable_len = length;
        Ok(())
    }

    /// Stages `data` at logical `offset`, which must equal [`position`].
    ///
    /// [`position`]: PageWriter::position
    pub fn write(&mut self, offset: u64, data: &[u8]) -> MessageSetResult<()> {
        if offset != self.position() {
            return Err(MessageSetError::invalid(format!(
                "non-sequential write at {}, expected {}",
                offset,
                self.position()
            )));
        }
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    /// Writes all staged bytes through `write_pages` as one page-aligned range.
    ///
    /// `write_pages` receives `(page_offset, pages)`. On failure nothing is
    /// advanced: the staged bytes stay staged and the error is returned.
    pub fn flush<F>(&mut self, write_pages: F) -> MessageSetResult<()>
    where
        F: FnOnce(u64, &[u8]) -> MessageSetResult<()>,
    {
        if self.staged_len() == 0 {
            return Ok(());
        }

        let logical_len = self.buffer.len();
        let padded_len = self.geometry.page_ceil(logical_len as u64) as usize;
        self.buffer.resize(padded_len, 0);
        let result = write_pages(self.buffer_start, &self.buffer);
        self.buffer.truncate(logical_len);
        result?;

        // Keep only the new trailing partial page.
        let end = self.buffer_start + logical_len as u64;
        let tail_start = self.geometry.page_floor(end);
        let drop = (tail_start - self.buffer_start) as usize;
        self.buffer.drain(..drop);
        self.buffer_start = tail_start;
        self.durable_len = self.buffer.len();
        Ok(())
    }

    /// Drops staged bytes that were never flushed.
    pub fn discard_staged(&mut self) {
        self.buffer.truncate(self.durable_len);
    }

    /// Forgets all state and returns to offset zero.
    pub fn reset(&mut self) {
        self.buffer_start = 0;
        self.buffer.clear();
        self.durable_len = 0;
    }
}
