//! Staging writer

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::errors::{StagingError, StagingResult};

/// Writes `(len: i32 LE, bytes)` frames to an underlying stream.
#[derive(Debug)]
pub struct StagingWriter<W: Write> {
    inner: W,
    records: u64,
    bytes: u64,
}

impl StagingWriter<BufWriter<File>> {
    /// Creates (or truncates) a staging file at `path`.
    pub fn create(path: &Path) -> StagingResult<Self> {
        let file = File::create(path).map_err(|e| {
            StagingError::io(format!("Failed to create staging file: {}", path.display()), e)
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> StagingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            records: 0,
            bytes: 0,
        }
    }

    /// Appends one payload frame.
    pub fn write(&mut self, payload: &[u8]) -> StagingResult<()> {
        let len = i32::try_from(payload.len()).map_err(|_| {
            StagingError::InvalidArgument(format!(
                "staged payload of {} bytes exceeds {}",
                payload.len(),
                i32::MAX
            ))
        })?;
        self.inner
            .write_all(&len.to_le_bytes())
            .and_then(|_| self.inner.write_all(payload))
            .map_err(|e| StagingError::io("Failed to write staging frame", e))?;
        self.records += 1;
        self.bytes += payload.len() as u64;
        Ok(())
    }

    /// Payloads written so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Payload bytes written so far, excluding length prefixes.
    pub fn payload_bytes(&self) -> u64 {
        self.bytes
    }

    /// Flushes and returns the underlying stream.
    pub fn finish(mut self) -> StagingResult<W> {
        self.inner
            .flush()
            .map_err(|e| StagingError::io("Failed to flush staging stream", e))?;
        Ok(self.inner)
    }
}
