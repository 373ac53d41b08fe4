//! Error kinds shared by every subsystem
//!
//! Each subsystem owns its own error enum, but all of them classify into
//! one of four kinds so callers can decide between recreate, retry and abort
//! without matching on subsystem-specific variants.

use std::fmt;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The backing container or chunk does not exist.
    NotFound,
    /// Transient or permanent failure of the backing store.
    Io,
    /// A frame could not be decoded.
    CorruptFrame,
    /// Rejected before any I/O was attempted.
    InvalidArgument,
}

impl ErrorKind {
    /// Stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "PAGELOG_NOT_FOUND",
            ErrorKind::Io => "PAGELOG_IO_ERROR",
            ErrorKind::CorruptFrame => "PAGELOG_CORRUPT_FRAME",
            ErrorKind::InvalidArgument => "PAGELOG_INVALID_ARGUMENT",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            ErrorKind::NotFound.code(),
            ErrorKind::Io.code(),
            ErrorKind::CorruptFrame.code(),
            ErrorKind::InvalidArgument.code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_display_uses_code() {
        assert_eq!(ErrorKind::NotFound.to_string(), "PAGELOG_NOT_FOUND");
    }
}
