//! Page store errors

use std::io;

use thiserror::Error;

use crate::errors::ErrorKind;

/// Result type for page store operations
pub type PageStoreResult<T> = Result<T, PageStoreError>;

/// Backing store errors
#[derive(Debug, Error)]
pub enum PageStoreError {
    #[error("Page store not found: {0}")]
    NotFound(String),

    #[error("Page store already exists: {0}")]
    AlreadyExists(String),

    #[error("Misaligned access: offset {offset}, length {length}, page size {page_size}")]
    Misaligned {
        offset: u64,
        length: u64,
        page_size: usize,
    },

    #[error("Access of {length} bytes at offset {offset} exceeds capacity {capacity}")]
    OutOfRange {
        offset: u64,
        length: u64,
        capacity: u64,
    },

    #[error("Invalid page size: {0}")]
    InvalidPageSize(usize),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Injected fault: {0}")]
    Injected(String),
}

impl PageStoreError {
    /// Wraps an I/O error, turning `NotFound` into the distinct not-found variant.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        let context = context.into();
        if source.kind() == io::ErrorKind::NotFound {
            PageStoreError::NotFound(context)
        } else {
            PageStoreError::Io { context, source }
        }
    }

    /// Coarse classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            PageStoreError::NotFound(_) => ErrorKind::NotFound,
            PageStoreError::AlreadyExists(_)
            | PageStoreError::Misaligned { .. }
            | PageStoreError::OutOfRange { .. }
            | PageStoreError::InvalidPageSize(_) => ErrorKind::InvalidArgument,
            PageStoreError::Io { .. } | PageStoreError::Injected(_) => ErrorKind::Io,
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Returns whether the backing container is missing.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
