//! Observability for pagelog
//!
//! Structured JSON logging through an explicitly passed [`Logger`].
//!
//! # Usage
//!
//! ```
//! use pagelog::observability::{Logger, Severity};
//!
//! let logger = Logger::stdout(Severity::Info).with_component("store");
//! logger.info("STORE_OPEN", &[("name", "events")]);
//! ```

mod logger;

pub use logger::{LogCapture, Logger, Severity};
