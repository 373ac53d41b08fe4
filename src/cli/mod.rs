//! CLI module for pagelog
//!
//! Provides command-line interface for:
//! - init: Create the page file and manifest
//! - append / import: Write records
//! - read / follow: Replay records, optionally from a checkpoint
//! - stage: Build a staging file for import
//! - info: Inspect store metadata

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{append, follow, import, info, init, read, run, run_command, stage};
pub use config::Config;
pub use errors::{CliError, CliResult};
pub use io::{decode_payload, encode_payload, write_error, write_response};
