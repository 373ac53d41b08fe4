//! Checkpoint errors

use std::io;

use thiserror::Error;

use crate::errors::ErrorKind;
use crate::messageset::MessageSetError;
use crate::store::StoreError;

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Errors raised while loading, saving or advancing a checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    MessageSet(#[from] MessageSetError),
}

impl CheckpointError {
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        CheckpointError::Io {
            path: path.into(),
            source,
        }
    }

    /// Coarse classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckpointError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                ErrorKind::NotFound
            }
            CheckpointError::Io { .. } => ErrorKind::Io,
            CheckpointError::Store(e) => e.kind(),
            CheckpointError::MessageSet(e) => e.kind(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }
}
