//! # Message Set
//!
//! The append/replay engine over a [`PageStore`](crate::pagestore::PageStore).
//!
//! - [`PageWriter`] stages bytes and emits page-aligned writes
//! - [`MessageSet`] frames records, batches flushes and grows capacity
//! - [`RecordReader`] replays frames lazily from a [`StorageOffset`]

mod errors;
pub mod frame;
mod geometry;
mod message_set;
mod offset;
mod page_writer;
mod reader;

pub use errors::{MessageSetError, MessageSetResult};
pub use geometry::{Geometry, DEFAULT_BATCH_LIMIT, DEFAULT_CHUNK_SIZE, DEFAULT_PAGE_SIZE};
pub use message_set::MessageSet;
pub use offset::{RetrievedRecord, StorageOffset};
pub use page_writer::PageWriter;
pub use reader::{RecordReader, TruncatedTail};
