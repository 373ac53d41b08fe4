//! CLI command implementations
//!
//! Each command loads the configuration, opens the store in the mode it
//! needs, and returns the JSON `data` of its response. `run` writes that
//! data (or the error) to stdout.

use std::fs;
use std::io::{self, BufRead};
use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::checkpoint::{replay_batch, ProcessingInfo};
use crate::messageset::{RetrievedRecord, StorageOffset};
use crate::staging::{StagingReader, StagingWriter};
use crate::store::{AppendOnlyStore, StoreError};

use super::args::{Cli, Command};
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{decode_payload, encode_payload, read_payload_lines, read_request, write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments, dispatches the command and writes the JSON response.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let result = run_command(cli.command, io::stdin().lock());
    match result {
        Ok(data) => write_response(io::stdout().lock(), data),
        Err(e) => {
            write_error(io::stdout().lock(), e.code(), &e.to_string())?;
            Err(e)
        }
    }
}

/// Run the appropriate command based on CLI args
pub fn run_command<R: BufRead>(cmd: Command, input: R) -> CliResult<Value> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Append { config, stream } => append(&config, &stream, input),
        Command::Read {
            config,
            from,
            to,
            max,
        } => read(&config, from, to, max),
        Command::Stage { output } => stage(&output, input),
        Command::Import {
            config,
            stream,
            staging,
        } => import(&config, &stream, &staging),
        Command::Follow {
            config,
            checkpoint,
            max,
        } => follow(&config, &checkpoint, max),
        Command::Info { config } => info(&config),
    }
}

/// Creates the data directory, page file and manifest.
pub fn init(config_path: &Path) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    fs::create_dir_all(config.data_path()).map_err(|e| {
        CliError::config(format!(
            "Failed to create directory {}: {}",
            config.data_dir, e
        ))
    })?;

    let store = AppendOnlyStore::create(
        config.data_path(),
        &config.log_name,
        config.geometry()?,
        config.logger()?,
    )?;

    Ok(json!({
        "initialized": true,
        "set_id": store.set_id().to_string(),
        "capacity": store.capacity(),
    }))
}

#[derive(Debug, Deserialize)]
struct AppendRequest {
    payloads: Vec<String>,
}

/// Appends the base64 payloads of one JSON request.
pub fn append<R: BufRead>(config_path: &Path, stream: &str, input: R) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    let request: AppendRequest = read_request(input)?;
    let payloads = request
        .payloads
        .iter()
        .map(|p| decode_payload(p))
        .collect::<CliResult<Vec<_>>>()?;

    let mut store = open_for_append(&config)?;
    let content_size = store.append(stream, &payloads)?;

    Ok(json!({
        "records": payloads.len(),
        "content_size": content_size,
    }))
}

/// Replays records between two offsets.
pub fn read(config_path: &Path, from: u64, to: Option<u64>, max: Option<usize>) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    let store = open_for_read(&config)?;

    let mut reader = store.read_all(
        StorageOffset::new(from),
        to.map(StorageOffset::new),
        max.unwrap_or(usize::MAX),
    )?;

    let mut records = Vec::new();
    let mut next = StorageOffset::new(from);
    for record in reader.by_ref() {
        let record = record.map_err(StoreError::from)?;
        next = record.next;
        records.push(record_json(&record));
    }

    let truncated = reader.truncated_at().map(|tail| {
        json!({
            "offset": tail.offset,
            "reason": tail.reason,
        })
    });

    Ok(json!({
        "records": records,
        "next": next,
        "truncated_at": truncated,
    }))
}

/// Writes base64 payload lines into a new staging file.
pub fn stage<R: BufRead>(output: &Path, input: R) -> CliResult<Value> {
    let mut writer = StagingWriter::create(output)?;
    for payload in read_payload_lines(input) {
        writer.write(&payload?)?;
    }
    let records = writer.records();
    let bytes = writer.payload_bytes();
    writer.finish()?;

    Ok(json!({
        "output": output.display().to_string(),
        "records": records,
        "bytes": bytes,
    }))
}

/// Imports a staging file under one stream key.
pub fn import(config_path: &Path, stream: &str, staging: &Path) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    let mut store = open_for_append(&config)?;
    let stats = store.import(stream, StagingReader::open(staging)?)?;

    Ok(json!({
        "records": stats.records,
        "bytes": stats.bytes,
        "seconds": stats.elapsed.as_secs_f64(),
        "content_size": stats.content_size,
    }))
}

/// Replays one batch from a checkpoint file and saves the advanced checkpoint.
pub fn follow(config_path: &Path, checkpoint: &Path, max: usize) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    let store = open_for_read(&config)?;
    let mut info = ProcessingInfo::load_or_default(checkpoint)?;

    let mut records = Vec::new();
    let outcome = replay_batch(&store, &mut info, max, |record| {
        records.push(record_json(record));
        true
    })?;
    info.save(checkpoint)?;

    Ok(json!({
        "records": records,
        "batch": outcome.records,
        "next_offset": info.next_offset,
        "events_processed": info.events_processed,
    }))
}

/// Prints store metadata.
pub fn info(config_path: &Path) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    let store = open_for_read(&config)?;
    let manifest = store.manifest();

    Ok(json!({
        "set_id": manifest.set_id.to_string(),
        "content_size": store.content_size(),
        "capacity": store.capacity(),
        "page_size": manifest.page_size,
        "chunk_size": manifest.chunk_size,
        "created_at": manifest.created_at.to_rfc3339(),
    }))
}

fn open_for_append(config: &Config) -> CliResult<AppendOnlyStore> {
    AppendOnlyStore::open(
        config.data_path(),
        &config.log_name,
        config.geometry()?,
        config.logger()?,
    )
    .map_err(not_initialized)
}

fn open_for_read(config: &Config) -> CliResult<AppendOnlyStore> {
    AppendOnlyStore::read_only(
        config.data_path(),
        &config.log_name,
        config.geometry()?,
        config.logger()?,
    )
    .map_err(not_initialized)
}

fn not_initialized(e: StoreError) -> CliError {
    if e.is_not_found() {
        CliError::NotInitialized(e)
    } else {
        CliError::Store(e)
    }
}

fn record_json(record: &RetrievedRecord) -> Value {
    json!({
        "key": record.stream_key,
        "data": encode_payload(&record.payload),
        "next": record.next,
    })
}
