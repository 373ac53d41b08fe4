//! # Checkpoints
//!
//! Resumable, batch-wise consumption of the log by projections.

mod errors;
mod processing;

pub use errors::{CheckpointError, CheckpointResult};
pub use processing::{replay_batch, BatchOutcome, ProcessingInfo, DEFAULT_BATCH_SIZE};
