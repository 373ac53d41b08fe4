//! CLI argument definitions using clap
//!
//! Commands:
//! - pagelog init --config <path>
//! - pagelog append --config <path> --stream <key>
//! - pagelog read --config <path> [--from N] [--to M] [--max K]
//! - pagelog stage --output <path>
//! - pagelog import --config <path> --stream <key> --staging <path>
//! - pagelog follow --config <path> --checkpoint <path> [--max K]
//! - pagelog info --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::checkpoint::DEFAULT_BATCH_SIZE;

/// pagelog - an append-only event log over a page-oriented store
#[derive(Parser, Debug)]
#[command(name = "pagelog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the page file and manifest
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./pagelog.json")]
        config: PathBuf,
    },

    /// Append base64 payloads read as one JSON request from stdin
    Append {
        /// Path to configuration file
        #[arg(long, default_value = "./pagelog.json")]
        config: PathBuf,

        /// Stream key applied to every payload
        #[arg(long)]
        stream: String,
    },

    /// Replay records from an offset
    Read {
        /// Path to configuration file
        #[arg(long, default_value = "./pagelog.json")]
        config: PathBuf,

        /// Offset to start from
        #[arg(long, default_value_t = 0)]
        from: u64,

        /// Offset to stop at (defaults to the content size)
        #[arg(long)]
        to: Option<u64>,

        /// Maximum number of records
        #[arg(long)]
        max: Option<usize>,
    },

    /// Write base64 payload lines from stdin into a staging file
    Stage {
        /// Staging file to create
        #[arg(long)]
        output: PathBuf,
    },

    /// Import a staging file under one stream key
    Import {
        /// Path to configuration file
        #[arg(long, default_value = "./pagelog.json")]
        config: PathBuf,

        /// Stream key applied to every payload
        #[arg(long)]
        stream: String,

        /// Staging file to import
        #[arg(long)]
        staging: PathBuf,
    },

    /// Replay one batch from a checkpoint and advance it
    Follow {
        /// Path to configuration file
        #[arg(long, default_value = "./pagelog.json")]
        config: PathBuf,

        /// Checkpoint file
        #[arg(long)]
        checkpoint: PathBuf,

        /// Maximum number of records in the batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        max: usize,
    },

    /// Print store metadata
    Info {
        /// Path to configuration file
        #[arg(long, default_value = "./pagelog.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
