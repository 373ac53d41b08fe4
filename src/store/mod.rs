//! # Append-Only Store
//!
//! File-backed event log: a page file, its manifest, and the command
//! interface (`append`, `import`, `read_all`) used by the binary and by
//! projection consumers.

mod append_only;
mod errors;
mod manifest;

pub use append_only::{AppendOnlyStore, ImportStats, StorePaths};
pub use errors::{StoreError, StoreResult};
pub use manifest::{Manifest, MANIFEST_FORMAT_VERSION};
