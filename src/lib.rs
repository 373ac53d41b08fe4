//! pagelog - An append-only event log on a page-oriented blob store
//!
//! Records are framed as `(stream key, payload)` pairs, packed into
//! fixed-size pages and replayed sequentially from any returned offset.

pub mod checkpoint;
pub mod cli;
pub mod durable;
pub mod errors;
pub mod messageset;
pub mod naming;
pub mod observability;
pub mod pagestore;
pub mod staging;
pub mod store;
