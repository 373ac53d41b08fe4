//! JSON I/O handling for CLI
//!
//! - Input: a single JSON object (append) or base64 lines (stage) on stdin
//! - Output: a single JSON object on stdout
//! - Payloads travel as standard base64

use std::io::{BufRead, Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Reads one JSON request from `input`.
pub fn read_request<T: DeserializeOwned, R: Read>(mut input: R) -> CliResult<T> {
    let mut content = String::new();
    input.read_to_string(&mut content)?;
    if content.trim().is_empty() {
        return Err(CliError::request("Empty input"));
    }
    Ok(serde_json::from_str(&content)?)
}

/// Decodes non-empty base64 lines from `input`.
pub fn read_payload_lines<R: BufRead>(input: R) -> impl Iterator<Item = CliResult<Vec<u8>>> {
    input
        .lines()
        .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
        .enumerate()
        .map(|(index, line)| {
            let line = line?;
            decode_payload(line.trim())
                .map_err(|e| CliError::request(format!("payload {}: {}", index + 1, e)))
        })
}

/// Decodes one base64 payload.
pub fn decode_payload(encoded: &str) -> CliResult<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| CliError::request(format!("invalid base64 payload: {}", e)))
}

/// Encodes one payload as base64.
pub fn encode_payload(payload: &[u8]) -> String {
    STANDARD.encode(payload)
}

/// Write a success response
pub fn write_response<W: Write>(mut out: W, data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    serde_json::to_writer(&mut out, &response)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Write an error response
pub fn write_error<W: Write>(mut out: W, code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    serde_json::to_writer(&mut out, &response)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
