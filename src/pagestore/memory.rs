//! # In-Memory Page Store
//!
//! Shared, cloneable store that records every physical operation. Used by the
//! test suite to observe page alignment and flush counts, and to inject
//! write, grow or read failures.

use std::io::{self, Cursor, Read};
use std::sync::{Arc, Mutex, MutexGuard};

use super::errors::{PageStoreError, PageStoreResult};
use super::store::{check_page_size, check_range, check_write, PageStore};

/// One physical write issued against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalWrite {
    pub offset: u64,
    pub length: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    data: Vec<u8>,
    deleted: bool,
    writes: Vec<PhysicalWrite>,
    grows: Vec<u64>,
    fail_next_write: bool,
    fail_next_grow: bool,
    fail_next_read_after: Option<u64>,
}

/// In-memory page store
#[derive(Debug, Clone)]
pub struct MemoryPageStore {
    page_size: usize,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryPageStore {
    /// Creates an empty store with zero capacity.
    pub fn new(page_size: usize) -> PageStoreResult<Self> {
        check_page_size(page_size)?;
        Ok(Self {
            page_size,
            state: Arc::new(Mutex::new(MemoryState::default())),
        })
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn live_state(&self) -> PageStoreResult<MutexGuard<'_, MemoryState>> {
        let state = self.state();
        if state.deleted {
            return Err(PageStoreError::NotFound("memory page store".to_string()));
        }
        Ok(state)
    }

    /// Simulates the container being deleted; every later call is `NotFound`.
    pub fn delete(&self) {
        self.state().deleted = true;
    }

    /// Makes the next `write_pages` call fail without touching the data.
    pub fn fail_next_write(&self) {
        self.state().fail_next_write = true;
    }

    /// Makes the next `grow` call that would extend capacity fail.
    pub fn fail_next_grow(&self) {
        self.state().fail_next_grow = true;
    }

    /// Makes the next read handle fail once it has returned `after` bytes.
    pub fn fail_next_read(&self, after: u64) {
        self.state().fail_next_read_after = Some(after);
    }

    /// Physical writes issued so far.
    pub fn writes(&self) -> Vec<PhysicalWrite> {
        self.state().writes.clone()
    }

    /// Capacities requested by `grow` calls that extended the store.
    pub fn grows(&self) -> Vec<u64> {
        self.state().grows.clone()
    }

    /// Clears the write and grow logs.
    pub fn clear_log(&self) {
        let mut state = self.state();
        state.writes.clear();
        state.grows.clear();
    }

    /// Copy of the full allocated contents.
    pub fn snapshot(&self) -> Vec<u8> {
        self.state().data.clone()
    }
}

impl PageStore for MemoryPageStore {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn write_pages(&self, offset: u64, data: &[u8]) -> PageStoreResult<()> {
        let mut state = self.live_state()?;
        if state.fail_next_write {
            state.fail_next_write = false;
            return Err(PageStoreError::Injected(format!(
                "write of {} bytes at {}",
                data.len(),
                offset
            )));
        }
        check_write(self.page_size, state.data.len() as u64, offset, data.len())?;

        let start = offset as usize;
        state.data[start..start + data.len()].copy_from_slice(data);
        state.writes.push(PhysicalWrite {
            offset,
            length: data.len(),
        });
        Ok(())
    }

    fn read_range(&self, offset: u64, length: usize) -> PageStoreResult<Vec<u8>> {
        let state = self.live_state()?;
        check_range(state.data.len() as u64, offset, length as u64)?;
        let start = offset as usize;
        Ok(state.data[start..start + length].to_vec())
    }

    fn grow(&self, new_capacity: u64) -> PageStoreResult<()> {
        let mut state = self.live_state()?;
        if new_capacity <= state.data.len() as u64 {
            return Ok(());
        }
        if new_capacity % self.page_size as u64 != 0 {
            return Err(PageStoreError::Misaligned {
                offset: 0,
                length: new_capacity,
                page_size: self.page_size,
            });
        }
        if state.fail_next_grow {
            state.fail_next_grow = false;
            return Err(PageStoreError::Injected(format!("grow to {}", new_capacity)));
        }

        state.data.resize(new_capacity as usize, 0);
        state.grows.push(new_capacity);
        Ok(())
    }

    fn capacity(&self) -> PageStoreResult<u64> {
        Ok(self.live_state()?.data.len() as u64)
    }

    fn open_read(&self, offset: u64) -> PageStoreResult<Box<dyn Read + Send>> {
        let mut state = self.live_state()?;
        let start = (offset as usize).min(state.data.len());
        let contents = Cursor::new(state.data[start..].to_vec());
        match state.fail_next_read_after.take() {
            Some(remaining) => Ok(Box::new(FailingRead {
                contents,
                remaining,
            })),
            None => Ok(Box::new(contents)),
        }
    }
}

/// Read handle that errors after a fixed number of bytes.
struct FailingRead {
    contents: Cursor<Vec<u8>>,
    remaining: u64,
}

impl Read for FailingRead {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "injected read failure"));
        }
        let limit = usize::try_from(self.remaining).unwrap_or(usize::MAX).min(buf.len());
        let read = self.contents.read(&mut buf[..limit])?;
        self.remaining -= read as u64;
        Ok(read)
    }
}
