//! Store errors

use std::io;

use thiserror::Error;

use crate::errors::ErrorKind;
use crate::messageset::MessageSetError;
use crate::naming::Validity;
use crate::pagestore::PageStoreError;
use crate::staging::StagingError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the append-only store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    MessageSet(#[from] MessageSetError),

    #[error(transparent)]
    PageStore(#[from] PageStoreError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error("Invalid stream key {key:?}: {validity}")]
    InvalidStreamKey { key: String, validity: Validity },

    #[error("Invalid log name {name:?}: {validity}")]
    InvalidLogName { name: String, validity: Validity },

    #[error("Store not found: {0}")]
    NotFound(String),

    #[error("Store already exists: {0}")]
    AlreadyExists(String),

    #[error("Manifest {path}: {source}")]
    Manifest {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Manifest records {field} = {recorded}, configured {configured}")]
    GeometryMismatch {
        field: &'static str,
        recorded: u64,
        configured: u64,
    },
}

impl StoreError {
    pub fn manifest(path: impl Into<String>, source: io::Error) -> Self {
        StoreError::Manifest {
            path: path.into(),
            source,
        }
    }

    /// Coarse classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::MessageSet(e) => e.kind(),
            StoreError::PageStore(e) => e.kind(),
            StoreError::Staging(e) => e.kind(),
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Manifest { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                ErrorKind::NotFound
            }
            StoreError::Manifest { .. } => ErrorKind::Io,
            StoreError::InvalidStreamKey { .. }
            | StoreError::InvalidLogName { .. }
            | StoreError::AlreadyExists(_)
            | StoreError::GeometryMismatch { .. } => ErrorKind::InvalidArgument,
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_kinds_are_preserved() {
        let err: StoreError = MessageSetError::from(PageStoreError::NotFound("x".into())).into();
        assert!(err.is_not_found());

        let err: StoreError = StagingError::CorruptFrame {
            offset: 0,
            reason: "cut".into(),
        }
        .into();
        assert_eq!(err.code(), "PAGELOG_CORRUPT_FRAME");
    }

    #[test]
    fn test_invalid_stream_key_message() {
        let err = StoreError::InvalidStreamKey {
            key: "A".into(),
            validity: Validity::TooShort,
        };
        assert_eq!(err.code(), "PAGELOG_INVALID_ARGUMENT");
        assert!(err.to_string().contains("shorter than 2"));
    }

    #[test]
    fn test_manifest_not_found() {
        let err = StoreError::manifest("m.json", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.is_not_found());
    }
}
