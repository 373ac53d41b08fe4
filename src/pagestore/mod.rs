//! Backing store adapters
//!
//! A page store is a pre-allocated blob that only accepts whole-page writes
//! inside its capacity. The append engine owns growth; the store only
//! enforces the physical rules.

mod errors;
mod file;
mod memory;
mod store;

pub use errors::{PageStoreError, PageStoreResult};
pub use file::FilePageStore;
pub use memory::{MemoryPageStore, PhysicalWrite};
pub use store::{check_page_size, check_range, check_write, PageStore};
