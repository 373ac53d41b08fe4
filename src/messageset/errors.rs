//! Message set errors

use std::io;

use thiserror::Error;

use crate::errors::ErrorKind;
use crate::pagestore::PageStoreError;

/// Result type for message set operations
pub type MessageSetResult<T> = Result<T, MessageSetError>;

/// Errors raised by the append engine and the sequential reader
#[derive(Debug, Error)]
pub enum MessageSetError {
    #[error(transparent)]
    Store(#[from] PageStoreError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Corrupt frame at offset {offset}: {reason}")]
    CorruptFrame { offset: u64, reason: String },

    #[error("Read failed at offset {offset}: {source}")]
    Read {
        offset: u64,
        #[source]
        source: io::Error,
    },
}

impl MessageSetError {
    /// Creates an invalid argument error
    pub fn invalid(message: impl Into<String>) -> Self {
        MessageSetError::InvalidArgument(message.into())
    }

    /// Coarse classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            MessageSetError::Store(e) => e.kind(),
            MessageSetError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            MessageSetError::CorruptFrame { .. } => ErrorKind::CorruptFrame,
            MessageSetError::Read { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                ErrorKind::NotFound
            }
            MessageSetError::Read { .. } => ErrorKind::Io,
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
