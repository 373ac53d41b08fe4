//! # Local File Page Store
//!
//! One pre-sized file per message set. The file length is the allocated
//! capacity; unwritten space reads back as zeros.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::errors::{PageStoreError, PageStoreResult};
use super::store::{check_page_size, check_range, check_write, PageStore};

/// Page store backed by a local file
#[derive(Debug)]
pub struct FilePageStore {
    path: PathBuf,
    page_size: usize,
    file: Mutex<File>,
}

impl FilePageStore {
    /// Creates a new page file with the given initial capacity.
    ///
    /// Fails with `AlreadyExists` if the file is already present.
    pub fn create(path: &Path, page_size: usize, capacity: u64) -> PageStoreResult<Self> {
        check_page_size(page_size)?;
        if capacity % page_size as u64 != 0 {
            return Err(PageStoreError::Misaligned {
                offset: 0,
                length: capacity,
                page_size,
            });
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    PageStoreError::io(
                        format!("Failed to create directory: {}", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    PageStoreError::AlreadyExists(path.display().to_string())
                } else {
                    PageStoreError::io(format!("Failed to create page file: {}", path.display()), e)
                }
            })?;

        file.set_len(capacity).map_err(|e| {
            PageStoreError::io(format!("Failed to size page file: {}", path.display()), e)
        })?;
        file.sync_all().map_err(|e| {
            PageStoreError::io(format!("Failed to sync page file: {}", path.display()), e)
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            page_size,
            file: Mutex::new(file),
        })
    }

    /// Opens an existing page file for reading and writing.
    pub fn open(path: &Path, page_size: usize) -> PageStoreResult<Self> {
        check_page_size(page_size)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                PageStoreError::io(format!("Failed to open page file: {}", path.display()), e)
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            page_size,
            file: Mutex::new(file),
        })
    }

    /// Returns the path to the page file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_reader(&self) -> PageStoreResult<(File, u64)> {
        let file = File::open(&self.path).map_err(|e| {
            PageStoreError::io(format!("Failed to open page file: {}", self.path.display()), e)
        })?;
        let len = file
            .metadata()
            .map_err(|e| PageStoreError::io("Failed to read page file metadata", e))?
            .len();
        Ok((file, len))
    }
}

impl PageStore for FilePageStore {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn write_pages(&self, offset: u64, data: &[u8]) -> PageStoreResult<()> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        let capacity = file
            .metadata()
            .map_err(|e| PageStoreError::io("Failed to read page file metadata", e))?
            .len();
        check_write(self.page_size, capacity, offset, data.len())?;

        file.seek(SeekFrom::Start(offset))
            .map_err(|e| PageStoreError::io(format!("Failed to seek to {}", offset), e))?;
        file.write_all(data).map_err(|e| {
            PageStoreError::io(
                format!("Failed to write {} bytes at {}", data.len(), offset),
                e,
            )
        })?;
        file.sync_data()
            .map_err(|e| PageStoreError::io("fsync failed after page write", e))?;
        Ok(())
    }

    fn read_range(&self, offset: u64, length: usize) -> PageStoreResult<Vec<u8>> {
        let (mut file, capacity) = self.open_reader()?;
        check_range(capacity, offset, length as u64)?;

        let mut buffer = vec![0u8; length];
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| PageStoreError::io(format!("Failed to seek to {}", offset), e))?;
        file.read_exact(&mut buffer).map_err(|e| {
            PageStoreError::io(format!("Failed to read {} bytes at {}", length, offset), e)
        })?;
        Ok(buffer)
    }

    fn grow(&self, new_capacity: u64) -> PageStoreResult<()> {
        let file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        let capacity = file
            .metadata()
            .map_err(|e| PageStoreError::io("Failed to read page file metadata", e))?
            .len();
        if new_capacity <= capacity {
            return Ok(());
        }
        if new_capacity % self.page_size as u64 != 0 {
            return Err(PageStoreError::Misaligned {
                offset: 0,
                length: new_capacity,
                page_size: self.page_size,
            });
        }

        file.set_len(new_capacity).map_err(|e| {
            PageStoreError::io(format!("Failed to grow page file to {}", new_capacity), e)
        })?;
        file.sync_all()
            .map_err(|e| PageStoreError::io("fsync failed after grow", e))?;
        Ok(())
    }

    fn capacity(&self) -> PageStoreResult<u64> {
        let file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        let len = file
            .metadata()
            .map_err(|e| PageStoreError::io("Failed to read page file metadata", e))?
            .len();
        Ok(len)
    }

    fn open_read(&self, offset: u64) -> PageStoreResult<Box<dyn Read + Send>> {
        let (mut file, capacity) = self.open_reader()?;
        let start = offset.min(capacity);
        file.seek(SeekFrom::Start(start))
            .map_err(|e| PageStoreError::io(format!("Failed to seek to {}", start), e))?;
        Ok(Box::new(file.take(capacity - start)))
    }
}
