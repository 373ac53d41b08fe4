//! Staging errors

use std::io;

use thiserror::Error;

use crate::errors::ErrorKind;

/// Result type for staging operations
pub type StagingResult<T> = Result<T, StagingError>;

/// Errors raised while writing or reading a staging stream
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt staging frame at offset {offset}: {reason}")]
    CorruptFrame { offset: u64, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl StagingError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        StagingError::Io {
            context: context.into(),
            source,
        }
    }

    /// Coarse classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            StagingError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                ErrorKind::NotFound
            }
            StagingError::Io { .. } => ErrorKind::Io,
            StagingError::CorruptFrame { .. } => ErrorKind::CorruptFrame,
            StagingError::InvalidArgument(_) => ErrorKind::InvalidArgument,
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
