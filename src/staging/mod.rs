//! # Staging
//!
//! Bulk imports arrive as a staging stream: payloads framed as
//! `(len: i32 LE, bytes)` with no stream key. The stream key is supplied by
//! the import request and applied to every payload.

mod errors;
mod reader;
mod writer;

pub use errors::{StagingError, StagingResult};
pub use reader::StagingReader;
pub use writer::StagingWriter;
