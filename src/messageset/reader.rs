//! Sequential record reader
//!
//! Decodes frames forward from a storage offset over its own read handle.
//! The sequence ends when the cursor reaches the end offset, the record
//! budget is spent, or the store runs out of bytes.
//!
//! A frame that cannot be completed (it runs past the end offset or past the
//! available bytes, or its header is malformed) ends the sequence without
//! being yielded. [`RecordReader::truncated_at`] reports where that happened.
//! I/O failures are yielded once as an `Err` item.

use std::io::{self, BufRead, BufReader, Read};

use crate::observability::Logger;
use crate::pagestore::PageStore;

use super::errors::{MessageSetError, MessageSetResult};
use super::frame::{VarintDecoder, VarintStep};
use super::offset::{RetrievedRecord, StorageOffset};

/// Where and why replay stopped before a complete frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncatedTail {
    pub offset: StorageOffset,
    pub reason: String,
}

enum Halt {
    Truncated(String),
    Corrupt(String),
    Io(io::Error),
}

/// Lazy, forward-only sequence of [`RetrievedRecord`].
///
/// Not restartable; open a new reader at the last `next` offset instead.
pub struct RecordReader {
    reader: BufReader<Box<dyn Read + Send>>,
    position: u64,
    end: Option<u64>,
    remaining: usize,
    finished: bool,
    truncated: Option<TruncatedTail>,
    logger: Logger,
}

impl RecordReader {
    /// Opens a read handle on `store` positioned at `start`.
    ///
    /// `end = None` reads until the store is exhausted. A missing store is
    /// reported here as a not-found error.
    pub fn open(
        store: &dyn PageStore,
        start: StorageOffset,
        end: Option<StorageOffset>,
        max_records: usize,
        logger: Logger,
    ) -> MessageSetResult<Self> {
        let handle = store.open_read(start.offset_in_bytes())?;
        Ok(Self {
            reader: BufReader::new(handle),
            position: start.offset_in_bytes(),
            end: end.map(|e| e.offset_in_bytes()),
            remaining: max_records,
            finished: false,
            truncated: None,
            logger,
        })
    }

    /// Current cursor position.
    pub fn position(&self) -> StorageOffset {
        StorageOffset::new(self.position)
    }

    /// Set when the sequence stopped at an incomplete or malformed frame.
    pub fn truncated_at(&self) -> Option<&TruncatedTail> {
        self.truncated.as_ref()
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), Halt> {
        self.check_end(buf.len() as u64)?;
        match self.reader.read_exact(buf) {
            Ok(()) => {
                self.position += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Halt::Truncated(
                format!("store ended inside a {}-byte field", buf.len()),
            )),
            Err(e) => Err(Halt::Io(e)),
        }
    }

    fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>, Halt> {
        self.check_end(len)?;
        let mut bytes = Vec::new();
        (&mut self.reader)
            .take(len)
            .read_to_end(&mut bytes)
            .map_err(Halt::Io)?;
        if (bytes.len() as u64) < len {
            return Err(Halt::Truncated(format!(
                "store ended after {} of {} bytes",
                bytes.len(),
                len
            )));
        }
        self.position += len;
        Ok(bytes)
    }

    fn check_end(&self, len: u64) -> Result<(), Halt> {
        match self.end {
            Some(end) if !fits_before(self.position, len, end) => Err(Halt::Truncated(
                format!("frame extends past end offset {}", end),
            )),
            _ => Ok(()),
        }
    }

    fn read_key_len(&mut self) -> Result<u32, Halt> {
        let mut decoder = VarintDecoder::default();
        let mut byte = [0u8; 1];
        loop {
            self.read_into(&mut byte)?;
            match decoder.push(byte[0]) {
                VarintStep::NeedMore => continue,
                VarintStep::Done(len) if len > i32::MAX as u32 => {
                    return Err(Halt::Corrupt(format!("stream key length {} out of range", len)))
                }
                VarintStep::Done(len) => return Ok(len),
                VarintStep::Overlong => {
                    return Err(Halt::Corrupt("stream key length prefix too long".to_string()))
                }
            }
        }
    }

    fn decode_frame(&mut self) -> Result<RetrievedRecord, Halt> {
        let key_len = self.read_key_len()?;
        let key_bytes = self.read_bytes(key_len as u64)?;
        let stream_key = String::from_utf8(key_bytes)
            .map_err(|_| Halt::Corrupt("stream key is not valid UTF-8".to_string()))?;

        let mut len_buf = [0u8; 4];
        self.read_into(&mut len_buf)?;
        let payload_len = i32::from_le_bytes(len_buf);
        if payload_len < 0 {
            return Err(Halt::Corrupt(format!("negative payload length {}", payload_len)));
        }
        let payload = self.read_bytes(payload_len as u64)?;

        Ok(RetrievedRecord {
            stream_key,
            payload,
            next: StorageOffset::new(self.position),
        })
    }

    fn stop(&mut self, frame_start: u64, reason: String) {
        self.logger.warn(
            "REPLAY_TRUNCATED_TAIL",
            &[("offset", &frame_start.to_string()), ("reason", &reason)],
        );
        self.truncated = Some(TruncatedTail {
            offset: StorageOffset::new(frame_start),
            reason,
        });
        self.finished = true;
    }
}

/// Whether `len` bytes from `position` end at or before `end`.
/// Overflow counts as past the end.
fn fits_before(position: u64, len: u64, end: u64) -> bool {
    matches!(position.checked_add(len), Some(frame_end) if frame_end <= end)
}

impl Iterator for RecordReader {
    type Item = MessageSetResult<RetrievedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.remaining == 0 {
            return None;
        }
        if matches!(self.end, Some(end) if self.position >= end) {
            self.finished = true;
            return None;
        }

        let frame_start = self.position;
        let exhausted = match self.reader.fill_buf() {
            Ok(available) => available.is_empty(),
            Err(source) => {
                self.finished = true;
                return Some(Err(MessageSetError::Read {
                    offset: frame_start,
                    source,
                }));
            }
        };
        if exhausted {
            self.finished = true;
            return None;
        }

        match self.decode_frame() {
            Ok(record) => {
                self.remaining -= 1;
                Some(Ok(record))
            }
            Err(Halt::Truncated(reason)) => {
                self.stop(frame_start, reason);
                None
            }
            Err(Halt::Corrupt(reason)) => {
                self.stop(frame_start, format!("corrupt frame: {}", reason));
                None
            }
            Err(Halt::Io(source)) => {
                self.finished = true;
                Some(Err(MessageSetError::Read {
                    offset: frame_start,
                    source,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messageset::frame;
    use crate::observability::Severity;
    use crate::pagestore::MemoryPageStore;

    fn store_with(bytes: &[u8]) -> MemoryPageStore {
        let store = MemoryPageStore::new(16).unwrap();
        let capacity = bytes.len().div_ceil(16) * 16;
        store.grow(capacity.max(16) as u64).unwrap();
        let mut pages = bytes.to_vec();
        pages.resize(capacity.max(16), 0);
        store.write_pages(0, &pages).unwrap();
        store
    }

    fn framed(records: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        for (key, payload) in records {
            frame::encode(&mut buf, key, payload).unwrap();
        }
        buf
    }

    fn open(store: &MemoryPageStore, start: u64, end: Option<u64>, max: usize) -> RecordReader {
        RecordReader::open(
            store,
            StorageOffset::new(start),
            end.map(StorageOffset::new),
            max,
            Logger::discard(),
        )
        .unwrap()
    }

    #[test]
    fn test_reads_records_with_next_offsets() {
        let bytes = framed(&[("a", &[1, 2]), ("bb", &[])]);
        let store = store_with(&bytes);

        let records: Vec<_> = open(&store, 0, Some(bytes.len() as u64), usize::MAX)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].stream_key, "a");
        assert_eq!(records[0].payload, vec![1, 2]);
        assert_eq!(records[0].next, StorageOffset::new(8));
        assert_eq!(records[1].stream_key, "bb");
        assert!(records[1].payload.is_empty());
        assert_eq!(records[1].next, StorageOffset::new(15));
    }

    #[test]
    fn test_max_records_bounds_output() {
        let bytes = framed(&[("k1", b"x"), ("k2", b"y"), ("k3", b"z")]);
        let store = store_with(&bytes);

        let records: Vec<_> = open(&store, 0, Some(bytes.len() as u64), 2)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);

        let none: Vec<_> = open(&store, 0, None, 0).collect();
        assert!(none.is_empty());
    }

    #[test]
    fn test_resume_from_next_offset() {
        let bytes = framed(&[("k1", b"x"), ("k2", b"y"), ("k3", b"z")]);
        let store = store_with(&bytes);
        let end = Some(bytes.len() as u64);

        let first = open(&store, 0, end, 1).next().unwrap().unwrap();
        let second = open(&store, first.next.offset_in_bytes(), end, 1)
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(second.stream_key, "k2");
    }

    #[test]
    fn test_frame_past_end_offset_is_not_yielded() {
        let bytes = framed(&[("k1", b"xyz"), ("k2", b"abc")]);
        let store = store_with(&bytes);

        let mut reader = open(&store, 0, Some(bytes.len() as u64 - 1), usize::MAX);
        assert_eq!(reader.next().unwrap().unwrap().stream_key, "k1");
        assert!(reader.next().is_none());

        let tail = reader.truncated_at().unwrap();
        assert_eq!(tail.offset, StorageOffset::new(10));
    }

    #[test]
    fn test_store_exhaustion_mid_frame_is_truncation() {
        // A frame claiming a 1000-byte payload in a 16-byte store.
        let mut bytes = vec![0x01, b'k'];
        bytes.extend_from_slice(&1000i32.to_le_bytes());
        let store = store_with(&bytes);

        let mut reader = open(&store, 0, None, usize::MAX);
        assert!(reader.next().is_none());
        assert!(reader.truncated_at().is_some());
    }

    #[test]
    fn test_negative_length_is_corrupt() {
        let mut bytes = vec![0x01, b'k'];
        bytes.extend_from_slice(&(-5i32).to_le_bytes());
        let store = store_with(&bytes);

        let (logger, capture) = Logger::capture(Severity::Trace);
        let mut reader = RecordReader::open(&store, StorageOffset::ZERO, None, 10, logger).unwrap();
        assert!(reader.next().is_none());
        assert!(reader.truncated_at().unwrap().reason.contains("negative"));
        assert_eq!(capture.events("REPLAY_TRUNCATED_TAIL").len(), 1);
    }

    #[test]
    fn test_invalid_utf8_key_is_corrupt() {
        let mut bytes = vec![0x02, 0xff, 0xfe];
        bytes.extend_from_slice(&0i32.to_le_bytes());
        let store = store_with(&bytes);

        let mut reader = open(&store, 0, Some(bytes.len() as u64), usize::MAX);
        assert!(reader.next().is_none());
        let tail = reader.truncated_at().unwrap();
        assert_eq!(tail.offset, StorageOffset::ZERO);
        assert!(tail.reason.contains("UTF-8"));
    }

    #[test]
    fn test_overlong_key_length_is_corrupt() {
        let mut bytes = framed(&[("k1", b"x")]);
        bytes.extend_from_slice(&[0x80; 5]);
        let store = store_with(&bytes);

        let mut reader = open(&store, 0, Some(bytes.len() as u64), usize::MAX);
        assert_eq!(reader.next().unwrap().unwrap().stream_key, "k1");
        assert!(reader.next().is_none());

        let tail = reader.truncated_at().unwrap();
        assert_eq!(tail.offset, StorageOffset::new(8));
        assert!(tail.reason.contains("too long"));
    }

    #[test]
    fn test_fits_before_treats_overflow_as_past_end() {
        assert!(fits_before(10, 5, 15));
        assert!(!fits_before(10, 6, 15));
        assert!(!fits_before(u64::MAX - 1, 4, u64::MAX));
        assert!(fits_before(u64::MAX - 4, 4, u64::MAX));
    }

    #[test]
    fn test_huge_payload_length_is_truncation() {
        let mut bytes = vec![0x01, b'k'];
        bytes.extend_from_slice(&100_000i32.to_le_bytes());
        let store = store_with(&bytes);

        let mut reader = open(&store, 0, Some(u64::MAX), usize::MAX);
        assert!(reader.next().is_none());
        assert_eq!(reader.truncated_at().unwrap().offset, StorageOffset::ZERO);
    }

    #[test]
    fn test_read_error_is_yielded_once() {
        let bytes = framed(&[("k1", b"xyz"), ("k2", b"abc")]);
        let store = store_with(&bytes);
        store.fail_next_read(0);

        let mut reader = open(&store, 0, Some(bytes.len() as u64), usize::MAX);
        let err = reader.next().unwrap().unwrap_err();
        assert_eq!(err.code(), "PAGELOG_IO_ERROR");
        assert!(reader.next().is_none());
        assert!(reader.truncated_at().is_none());
    }

    #[test]
    fn test_read_error_mid_frame_ends_sequence() {
        let bytes = framed(&[("k1", b"xyz"), ("k2", b"abc")]);
        let store = store_with(&bytes);
        // The first frame is 10 bytes; the handle fails 3 bytes into the second.
        store.fail_next_read(13);

        let mut reader = open(&store, 0, Some(bytes.len() as u64), usize::MAX);
        assert_eq!(reader.next().unwrap().unwrap().stream_key, "k1");
        let err = reader.next().unwrap().unwrap_err();
        assert_eq!(err.code(), "PAGELOG_IO_ERROR");
        assert!(reader.next().is_none());
        assert!(reader.truncated_at().is_none());
    }

    #[test]
    fn test_start_at_end_yields_nothing() {
        let bytes = framed(&[("k1", b"x")]);
        let store = store_with(&bytes);
        let len = bytes.len() as u64;

        let mut reader = open(&store, len, Some(len), usize::MAX);
        assert!(reader.next().is_none());
        assert!(reader.truncated_at().is_none());
    }

    #[test]
    fn test_missing_store_is_not_found() {
        let store = MemoryPageStore::new(16).unwrap();
        store.delete();
        let result = RecordReader::open(&store, StorageOffset::ZERO, None, 1, Logger::discard());
        assert!(result.err().unwrap().is_not_found());
    }
}
