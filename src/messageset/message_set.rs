//! Append engine
//!
//! A `MessageSet` is the single writer of one page store. Records are framed
//! into the page writer; whenever the staged bytes would cross the batching
//! threshold they are flushed first. Capacity is grown in whole chunk
//! increments before any physical write that would run past it.
//!
//! The content size only moves after a successful flush. Readers never see
//! staged bytes.

use std::sync::Arc;

use crate::observability::Logger;
use crate::pagestore::PageStore;

use super::errors::{MessageSetError, MessageSetResult};
use super::frame;
use super::geometry::Geometry;
use super::offset::StorageOffset;
use super::page_writer::PageWriter;
use super::reader::RecordReader;

/// One append target and its page buffer.
#[derive(Debug)]
pub struct MessageSet {
    store: Arc<dyn PageStore>,
    geometry: Geometry,
    page_writer: PageWriter,
    content_size: u64,
    capacity: u64,
    writable: bool,
    logger: Logger,
}

impl MessageSet {
    /// Initializes an empty message set, growing the store to one chunk.
    pub fn create_new(
        store: Arc<dyn PageStore>,
        geometry: Geometry,
        logger: Logger,
    ) -> MessageSetResult<Self> {
        check_geometry(store.as_ref(), &geometry)?;
        store.grow(geometry.chunk_size)?;
        let capacity = store.capacity()?;

        Ok(Self {
            store,
            geometry,
            page_writer: PageWriter::new(geometry),
            content_size: 0,
            capacity,
            writable: true,
            logger: logger.with_component("message_set"),
        })
    }

    /// Resumes appending to a store that already holds `content_size` bytes.
    ///
    /// The trailing partial page is read back so the next flush rewrites it
    /// with its real contents.
    pub fn open_existing(
        store: Arc<dyn PageStore>,
        geometry: Geometry,
        content_size: u64,
        logger: Logger,
    ) -> MessageSetResult<Self> {
        check_geometry(store.as_ref(), &geometry)?;
        let capacity = store.capacity()?;
        check_content_size(content_size, capacity)?;

        let mut page_writer = PageWriter::new(geometry);
        page_writer.cache_trailing_page(content_size, |start, length| {
            Ok(store.read_range(start, length)?)
        })?;

        let logger = logger.with_component("message_set");
        logger.info(
            "MESSAGE_SET_REOPEN",
            &[
                ("capacity", &capacity.to_string()),
                ("content_size", &content_size.to_string()),
            ],
        );

        Ok(Self {
            store,
            geometry,
            page_writer,
            content_size,
            capacity,
            writable: true,
            logger,
        })
    }

    /// Opens a read-only view. `append` on it is rejected.
    pub fn open_for_reading(
        store: Arc<dyn PageStore>,
        geometry: Geometry,
        content_size: u64,
        logger: Logger,
    ) -> MessageSetResult<Self> {
        check_geometry(store.as_ref(), &geometry)?;
        let capacity = store.capacity()?;
        check_content_size(content_size, capacity)?;

        Ok(Self {
            store,
            geometry,
            page_writer: PageWriter::new(geometry),
            content_size,
            capacity,
            writable: false,
            logger: logger.with_component("message_set"),
        })
    }

    /// Appends `payloads` under one stream key and returns the new content size.
    ///
    /// An empty sequence is a no-op. On failure, bytes staged by this call
    /// but not yet flushed are discarded; earlier batches of the same call
    /// that were already flushed stay durable and counted.
    pub fn append<I, B>(&mut self, stream_key: &str, payloads: I) -> MessageSetResult<u64>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        self.try_append(stream_key, payloads.into_iter().map(Ok))
    }

    /// Like [`append`](MessageSet::append), for payload sources that can fail.
    ///
    /// The first `Err` item aborts the call with the same discard semantics
    /// as a failed write.
    pub fn try_append<I, B, E>(&mut self, stream_key: &str, payloads: I) -> Result<u64, E>
    where
        I: IntoIterator<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: From<MessageSetError>,
    {
        if !self.writable {
            return Err(MessageSetError::invalid("message set was opened for reading").into());
        }

        let result = self.append_records(stream_key, payloads);
        if result.is_err() {
            self.page_writer.discard_staged();
        }
        result
    }

    fn append_records<I, B, E>(&mut self, stream_key: &str, payloads: I) -> Result<u64, E>
    where
        I: IntoIterator<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: From<MessageSetError>,
    {
        let mut encoded = Vec::new();
        for payload in payloads {
            let payload = payload?;
            let payload = payload.as_ref();
            let frame_len = frame::encoded_len(stream_key, payload.len())?;

            let staged = self.page_writer.staged_len();
            if staged > 0 && staged + frame_len >= self.geometry.batch_limit {
                self.flush_staging()?;
            }

            encoded.clear();
            frame::encode(&mut encoded, stream_key, payload)?;
            let position = self.page_writer.position();
            self.page_writer.write(position, &encoded)?;
        }

        self.flush_staging()?;
        Ok(self.content_size)
    }

    fn flush_staging(&mut self) -> MessageSetResult<()> {
        let staged = self.page_writer.staged_len();
        if staged == 0 {
            return Ok(());
        }

        let store = self.store.as_ref();
        let geometry = &self.geometry;
        let capacity = &mut self.capacity;
        let logger = &self.logger;
        self.page_writer
            .flush(|offset, pages| write_pages(store, geometry, capacity, logger, offset, pages))?;

        self.content_size = self.page_writer.flushed_position();
        self.logger.trace(
            "MESSAGE_SET_FLUSH",
            &[
                ("bytes", &staged.to_string()),
                ("content_size", &self.content_size.to_string()),
            ],
        );
        Ok(())
    }

    /// Discards staged state and returns the logical position to zero.
    pub fn reset(&mut self) {
        self.page_writer.reset();
        self.content_size = 0;
    }

    /// Lazily replays records from `start`.
    ///
    /// The end offset is clamped to the content size, so unused capacity is
    /// never decoded; `end = None` reads every record. See [`RecordReader`]
    /// for the stop conditions.
    pub fn read_all(
        &self,
        start: StorageOffset,
        end: Option<StorageOffset>,
        max_records: usize,
    ) -> MessageSetResult<RecordReader> {
        let content_end = StorageOffset::new(self.content_size);
        let end = end.map_or(content_end, |end| end.min(content_end));
        RecordReader::open(
            self.store.as_ref(),
            start,
            Some(end),
            max_records,
            self.logger.clone(),
        )
    }

    pub fn content_size(&self) -> u64 {
        self.content_size
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }
}

/// Grows capacity to cover the write if needed, then issues it.
fn write_pages(
    store: &dyn PageStore,
    geometry: &Geometry,
    capacity: &mut u64,
    logger: &Logger,
    offset: u64,
    pages: &[u8],
) -> MessageSetResult<()> {
    let end = offset + pages.len() as u64;
    if end > *capacity {
        let mut target = *capacity;
        while target < end {
            target += geometry.chunk_size;
        }
        logger.info(
            "MESSAGE_SET_GROW",
            &[
                ("from", &capacity.to_string()),
                ("required", &end.to_string()),
                ("to", &target.to_string()),
            ],
        );
        store.grow(target)?;
        *capacity = target;
    }
    store.write_pages(offset, pages)?;
    Ok(())
}

fn check_geometry(store: &dyn PageStore, geometry: &Geometry) -> MessageSetResult<()> {
    geometry.validate()?;
    if store.page_size() != geometry.page_size {
        return Err(MessageSetError::invalid(format!(
            "store page size {} does not match configured page size {}",
            store.page_size(),
            geometry.page_size
        )));
    }
    Ok(())
}

fn check_content_size(content_size: u64, capacity: u64) -> MessageSetResult<()> {
    if content_size > capacity {
        return Err(MessageSetError::invalid(format!(
            "content size {} exceeds capacity {}",
            content_size, capacity
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::Severity;
    use crate::pagestore::{MemoryPageStore, PhysicalWrite};

    fn geometry() -> Geometry {
        Geometry::new(512, 4096, 1024).unwrap()
    }

    fn new_set(store: &MemoryPageStore) -> MessageSet {
        MessageSet::create_new(Arc::new(store.clone()), geometry(), Logger::discard()).unwrap()
    }

    fn replay(set: &MessageSet) -> Vec<(String, Vec<u8>)> {
        set.read_all(StorageOffset::ZERO, Some(StorageOffset::new(set.content_size())), usize::MAX)
            .unwrap()
            .map(|r| r.map(|r| (r.stream_key, r.payload)))
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_two_record_scenario() {
        let store = MemoryPageStore::new(512).unwrap();
        let mut set = MessageSet::create_new(
            Arc::new(store.clone()),
            Geometry::default(),
            Logger::discard(),
        )
        .unwrap();
        assert_eq!(set.capacity(), 4 * 1024 * 1024);

        set.append("a", [vec![0x01u8, 0x02]]).unwrap();
        let size = set.append("bb", [Vec::<u8>::new()]).unwrap();
        assert_eq!(size, 15);

        let records: Vec<_> = set
            .read_all(StorageOffset::ZERO, None, 2)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].stream_key, "a");
        assert_eq!(records[0].payload, vec![0x01, 0x02]);
        assert_eq!(records[1].stream_key, "bb");
        assert!(records[1].payload.is_empty());
        assert_eq!(records[1].next, StorageOffset::new(15));
    }

    #[test]
    fn test_unbounded_replay_stops_at_content_size() {
        let store = MemoryPageStore::new(512).unwrap();
        let mut set = new_set(&store);
        set.append("a", [vec![0x01u8, 0x02]]).unwrap();
        set.append("bb", [Vec::<u8>::new()]).unwrap();

        let mut reader = set.read_all(StorageOffset::ZERO, None, usize::MAX).unwrap();
        let keys: Vec<String> = reader
            .by_ref()
            .map(|r| r.map(|r| r.stream_key))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(keys, vec!["a", "bb"]);
        assert!(reader.truncated_at().is_none());

        // An end offset inside unused capacity is clamped as well.
        let past = set
            .read_all(StorageOffset::ZERO, Some(StorageOffset::new(4000)), usize::MAX)
            .unwrap();
        assert_eq!(past.count(), 2);
    }

    #[test]
    fn test_empty_set_replays_nothing() {
        let store = MemoryPageStore::new(512).unwrap();
        let set = new_set(&store);
        assert_eq!(set.read_all(StorageOffset::ZERO, None, usize::MAX).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_append_is_noop() {
        let store = MemoryPageStore::new(512).unwrap();
        let mut set = new_set(&store);
        set.append("k1", [b"x"]).unwrap();
        store.clear_log();

        let size = set.append("k1", Vec::<Vec<u8>>::new()).unwrap();
        assert_eq!(size, 8);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_batching_threshold_splits_flushes() {
        let store = MemoryPageStore::new(512).unwrap();
        let mut set = new_set(&store);

        // 307-byte frames; three fit under the 1024-byte threshold.
        let payloads = vec![vec![7u8; 300]; 10];
        let size = set.append("k1", &payloads).unwrap();

        assert_eq!(size, 3070);
        assert_eq!(store.writes().len(), 4);
        for write in store.writes() {
            assert_eq!(write.offset % 512, 0);
            assert_eq!(write.length % 512, 0);
        }
        assert_eq!(replay(&set).len(), 10);
    }

    #[test]
    fn test_record_larger_than_chunk_grows_capacity() {
        let store = MemoryPageStore::new(512).unwrap();
        let (logger, capture) = Logger::capture(Severity::Info);
        let mut set =
            MessageSet::create_new(Arc::new(store.clone()), geometry(), logger).unwrap();

        let big = vec![3u8; 10_000];
        let size = set.append("k1", [&big]).unwrap();

        assert_eq!(size, 10_007);
        assert_eq!(set.capacity(), 12_288);
        assert_eq!(store.grows(), vec![4096, 12_288]);
        assert_eq!(capture.events("MESSAGE_SET_GROW").len(), 1);
        assert_eq!(replay(&set), vec![("k1".to_string(), big)]);
    }

    #[test]
    fn test_failed_write_leaves_content_size() {
        let store = MemoryPageStore::new(512).unwrap();
        let mut set = new_set(&store);
        set.append("k1", [b"a"]).unwrap();

        store.fail_next_write();
        let err = set.append("k1", [b"b"]).unwrap_err();
        assert_eq!(err.code(), "PAGELOG_IO_ERROR");
        assert_eq!(set.content_size(), 8);

        set.append("k1", [b"c"]).unwrap();
        assert_eq!(
            replay(&set),
            vec![("k1".to_string(), b"a".to_vec()), ("k1".to_string(), b"c".to_vec())]
        );
    }

    #[test]
    fn test_failed_grow_writes_nothing() {
        let store = MemoryPageStore::new(512).unwrap();
        let mut set = new_set(&store);
        store.clear_log();

        store.fail_next_grow();
        assert!(set.append("k1", [vec![0u8; 5000]]).is_err());
        assert_eq!(set.capacity(), 4096);
        assert_eq!(set.content_size(), 0);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_failure_after_flushed_batch_keeps_earlier_batches() {
        let store = MemoryPageStore::new(512).unwrap();
        let mut set = new_set(&store);

        // The first batch of three frames flushes; the final flush fails.
        let payloads = vec![vec![1u8; 300]; 5];
        store.clear_log();
        let mut calls = 0;
        let result = set.append(
            "k1",
            payloads.iter().inspect(|_| {
                calls += 1;
                if calls == 5 {
                    store.fail_next_write();
                }
            }),
        );
        assert!(result.is_err());
        assert_eq!(set.content_size(), 921);
        assert_eq!(replay(&set).len(), 3);
    }

    #[test]
    fn test_try_append_source_error_discards_staged() {
        let store = MemoryPageStore::new(512).unwrap();
        let mut set = new_set(&store);
        set.append("k1", [b"kept"]).unwrap();
        store.clear_log();

        let items: Vec<Result<&[u8], MessageSetError>> = vec![
            Ok(&b"lost"[..]),
            Err(MessageSetError::invalid("source failed")),
        ];
        assert!(set.try_append("k1", items).is_err());
        assert!(store.writes().is_empty());
        assert_eq!(set.content_size(), 11);

        set.append("k1", [b"next"]).unwrap();
        assert_eq!(
            replay(&set),
            vec![("k1".to_string(), b"kept".to_vec()), ("k1".to_string(), b"next".to_vec())]
        );
    }

    #[test]
    fn test_reopen_mid_page_preserves_tail() {
        let store = MemoryPageStore::new(512).unwrap();
        let mut set = new_set(&store);
        let size = set.append("k1", [b"first"]).unwrap();
        assert_eq!(size, 12);
        drop(set);

        let mut reopened =
            MessageSet::open_existing(Arc::new(store.clone()), geometry(), size, Logger::discard())
                .unwrap();
        store.clear_log();
        reopened.append("k1", [b"second"]).unwrap();

        assert_eq!(
            store.writes(),
            vec![PhysicalWrite {
                offset: 0,
                length: 512
            }]
        );
        assert_eq!(
            replay(&reopened),
            vec![
                ("k1".to_string(), b"first".to_vec()),
                ("k1".to_string(), b"second".to_vec()),
            ]
        );
    }

    #[test]
    fn test_open_existing_rejects_size_past_capacity() {
        let store = MemoryPageStore::new(512).unwrap();
        new_set(&store);
        let result =
            MessageSet::open_existing(Arc::new(store.clone()), geometry(), 5000, Logger::discard());
        assert_eq!(result.unwrap_err().code(), "PAGELOG_INVALID_ARGUMENT");
    }

    #[test]
    fn test_page_size_mismatch_rejected() {
        let store = MemoryPageStore::new(1024).unwrap();
        let result = MessageSet::create_new(Arc::new(store), geometry(), Logger::discard());
        assert!(result.is_err());
    }

    #[test]
    fn test_read_only_view_rejects_append() {
        let store = MemoryPageStore::new(512).unwrap();
        let mut writer = new_set(&store);
        let size = writer.append("k1", [b"x"]).unwrap();

        let mut reader =
            MessageSet::open_for_reading(Arc::new(store.clone()), geometry(), size, Logger::discard())
                .unwrap();
        assert!(!reader.is_writable());
        assert!(reader.append("k1", [b"y"]).is_err());
        assert_eq!(replay(&reader).len(), 1);
    }

    #[test]
    fn test_reset_rewrites_from_zero() {
        let store = MemoryPageStore::new(512).unwrap();
        let mut set = new_set(&store);
        set.append("k1", [b"old-record"]).unwrap();

        set.reset();
        assert_eq!(set.content_size(), 0);
        set.append("k2", [b"new"]).unwrap();
        assert_eq!(replay(&set), vec![("k2".to_string(), b"new".to_vec())]);
    }

    #[test]
    fn test_missing_store_is_not_found() {
        let store = MemoryPageStore::new(512).unwrap();
        let set = new_set(&store);
        store.delete();
        let err = set.read_all(StorageOffset::ZERO, None, 1).err().unwrap();
        assert!(err.is_not_found());
    }
}
