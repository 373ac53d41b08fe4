//! Configuration file
//!
//! ```json
//! {
//!   "data_dir": "/var/lib/pagelog",
//!   "log_name": "events",
//!   "page_size": 512,
//!   "chunk_size": 4194304,
//!   "batch_limit": 4193280,
//!   "log_level": "info"
//! }
//! ```
//!
//! Only `data_dir` is required.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::messageset::{Geometry, DEFAULT_BATCH_LIMIT, DEFAULT_CHUNK_SIZE, DEFAULT_PAGE_SIZE};
use crate::naming::validate_stream_key;
use crate::observability::{Logger, Severity};

use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Data directory (required)
    pub data_dir: String,

    /// Name of the log inside the data directory
    #[serde(default = "default_log_name")]
    pub log_name: String,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,

    /// Minimum severity written to stderr
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_name() -> String {
    "events".to_string()
}
fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}
fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}
fn default_batch_limit() -> usize {
    DEFAULT_BATCH_LIMIT
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse and validate configuration JSON
    pub fn parse(content: &str) -> CliResult<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| CliError::config(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(CliError::config("data_dir must not be empty"));
        }

        let validity = validate_stream_key(&self.log_name);
        if !validity.is_valid() {
            return Err(CliError::config(format!(
                "Invalid log_name '{}': {}",
                self.log_name, validity
            )));
        }

        self.geometry()?;
        self.severity()?;
        Ok(())
    }

    /// Get data directory as Path
    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    /// Page, chunk and batching sizes
    pub fn geometry(&self) -> CliResult<Geometry> {
        Geometry::new(self.page_size, self.chunk_size, self.batch_limit)
            .map_err(|e| CliError::config(e.to_string()))
    }

    fn severity(&self) -> CliResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            CliError::config(format!(
                "Invalid log_level '{}'. Must be one of trace, info, warn, error.",
                self.log_level
            ))
        })
    }

    /// Logger writing to stderr, keeping stdout for responses
    pub fn logger(&self) -> CliResult<Logger> {
        Ok(Logger::stderr(self.severity()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse(r#"{"data_dir": "/tmp/pagelog"}"#).unwrap();
        assert_eq!(config.log_name, "events");
        assert_eq!(config.geometry().unwrap(), Geometry::default());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_missing_data_dir() {
        assert!(Config::parse("{}").is_err());
        assert!(Config::parse(r#"{"data_dir": " "}"#).is_err());
    }

    #[test]
    fn test_invalid_geometry() {
        let err = Config::parse(r#"{"data_dir": "d", "page_size": 500}"#).unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn test_invalid_log_level() {
        assert!(Config::parse(r#"{"data_dir": "d", "log_level": "verbose"}"#).is_err());
        assert!(Config::parse(r#"{"data_dir": "d", "log_level": "warn"}"#).is_ok());
    }

    #[test]
    fn test_invalid_log_name() {
        assert!(Config::parse(r#"{"data_dir": "d", "log_name": "Events"}"#).is_err());
    }
}
