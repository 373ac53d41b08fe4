//! CLI error types
//!
//! Every error is reported as a JSON error object on stdout and a non-zero
//! exit code.

use std::io;

use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::errors::ErrorKind;
use crate::staging::StagingError;
use crate::store::StoreError;

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    Request(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}. Run 'pagelog init' first.")]
    NotInitialized(#[source] StoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

impl CliError {
    pub fn config(message: impl Into<String>) -> Self {
        CliError::Config(message.into())
    }

    pub fn request(message: impl Into<String>) -> Self {
        CliError::Request(message.into())
    }

    /// Coarse classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            CliError::Config(_) | CliError::Request(_) => ErrorKind::InvalidArgument,
            CliError::Io(e) if e.kind() == io::ErrorKind::NotFound => ErrorKind::NotFound,
            CliError::Io(_) => ErrorKind::Io,
            CliError::NotInitialized(_) => ErrorKind::NotFound,
            CliError::Store(e) => e.kind(),
            CliError::Staging(e) => e.kind(),
            CliError::Checkpoint(e) => e.kind(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Request(format!("JSON error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_code() {
        let err = CliError::config("page_size must be a power of two");
        assert_eq!(err.code(), "PAGELOG_INVALID_ARGUMENT");
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_store_kind_passes_through() {
        let err: CliError = StoreError::NotFound("events".into()).into();
        assert_eq!(err.code(), "PAGELOG_NOT_FOUND");
    }
}
