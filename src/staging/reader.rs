//! Staging reader
//!
//! Unlike replay, a staging stream must be complete: a frame cut short is
//! an error, because importing a partial payload would silently lose data.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use super::errors::{StagingError, StagingResult};

/// Iterates payloads of a `(len: i32 LE, bytes)*` stream.
#[derive(Debug)]
pub struct StagingReader<R: Read> {
    inner: R,
    offset: u64,
    finished: bool,
}

impl StagingReader<BufReader<File>> {
    /// Opens the staging file at `path`.
    pub fn open(path: &Path) -> StagingResult<Self> {
        let file = File::open(path).map_err(|e| {
            StagingError::io(format!("Failed to open staging file: {}", path.display()), e)
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> StagingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            finished: false,
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn corrupt(&self, frame_start: u64, reason: impl Into<String>) -> StagingError {
        StagingError::CorruptFrame {
            offset: frame_start,
            reason: reason.into(),
        }
    }

    /// Fills `buf` completely. Returns the number of bytes read, which is
    /// short only at end of stream.
    fn fill(&mut self, buf: &mut [u8]) -> StagingResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(StagingError::io("Failed to read staging stream", e)),
            }
        }
        self.offset += filled as u64;
        Ok(filled)
    }

    fn read_frame(&mut self) -> StagingResult<Option<Vec<u8>>> {
        let frame_start = self.offset;
        let mut len_buf = [0u8; 4];
        match self.fill(&mut len_buf)? {
            0 => return Ok(None),
            4 => {}
            n => return Err(self.corrupt(frame_start, format!("length prefix cut after {} bytes", n))),
        }

        let len = i32::from_le_bytes(len_buf);
        if len < 0 {
            return Err(self.corrupt(frame_start, format!("negative length {}", len)));
        }

        let mut payload = Vec::new();
        (&mut self.inner)
            .take(len as u64)
            .read_to_end(&mut payload)
            .map_err(|e| StagingError::io("Failed to read staging stream", e))?;
        self.offset += payload.len() as u64;
        if payload.len() < len as usize {
            return Err(self.corrupt(
                frame_start,
                format!("payload cut after {} of {} bytes", payload.len(), len),
            ));
        }
        Ok(Some(payload))
    }
}

impl<R: Read> Iterator for StagingReader<R> {
    type Item = StagingResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_frame() {
            Ok(Some(payload)) => Some(Ok(payload)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
