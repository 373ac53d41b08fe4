//! Structured JSON logger
//!
//! - One log line = one event
//! - `event` first, `severity` second, remaining keys sorted
//! - Synchronous, no buffering
//!
//! A `Logger` is a value handed to each component at construction. There is
//! no process-wide logger; components that were not given one log nowhere.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
    /// Unrecoverable, process exits
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// Parses a configuration value such as `"info"` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "trace" => Some(Severity::Trace),
            "info" => Some(Severity::Info),
            "warn" => Some(Severity::Warn),
            "error" => Some(Severity::Error),
            "fatal" => Some(Severity::Fatal),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
enum Sink {
    Stdout,
    Stderr,
    Discard,
    Buffer(Arc<Mutex<Vec<u8>>>),
}

/// A structured logger that outputs JSON lines to its sink.
#[derive(Debug, Clone)]
pub struct Logger {
    min_severity: Severity,
    component: Option<Arc<str>>,
    sink: Sink,
}

impl Logger {
    /// Logger writing events below ERROR to stdout and ERROR and above to
    /// stderr. Events under `min_severity` are dropped.
    pub fn stdout(min_severity: Severity) -> Self {
        Self {
            min_severity,
            component: None,
            sink: Sink::Stdout,
        }
    }

    /// Logger writing everything to stderr.
    pub fn stderr(min_severity: Severity) -> Self {
        Self {
            min_severity,
            component: None,
            sink: Sink::Stderr,
        }
    }

    /// Logger that drops every event.
    pub fn discard() -> Self {
        Self {
            min_severity: Severity::Fatal,
            component: None,
            sink: Sink::Discard,
        }
    }

    /// Logger writing into an in-memory buffer that can be inspected.
    pub fn capture(min_severity: Severity) -> (Self, LogCapture) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let logger = Self {
            min_severity,
            component: None,
            sink: Sink::Buffer(Arc::clone(&buffer)),
        };
        (logger, LogCapture { buffer })
    }

    /// Returns a copy of this logger that stamps `component` on every line.
    pub fn with_component(&self, component: &str) -> Self {
        Self {
            min_severity: self.min_severity,
            component: Some(Arc::from(component)),
            sink: self.sink.clone(),
        }
    }

    /// Returns whether events at `severity` are emitted.
    pub fn enabled(&self, severity: Severity) -> bool {
        !matches!(self.sink, Sink::Discard) && severity >= self.min_severity
    }

    /// Log an event with the given severity and fields
    pub fn log(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !self.enabled(severity) {
            return;
        }

        let line = self.format_line(severity, event, fields);

        match &self.sink {
            Sink::Stdout if severity >= Severity::Error => write_line(&mut io::stderr(), &line),
            Sink::Stdout => write_line(&mut io::stdout(), &line),
            Sink::Stderr => write_line(&mut io::stderr(), &line),
            Sink::Buffer(buffer) => {
                let mut guard = buffer.lock().unwrap_or_else(|e| e.into_inner());
                guard.extend_from_slice(line.as_bytes());
            }
            Sink::Discard => {}
        }
    }

    fn format_line(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut output = String::with_capacity(256);

        output.push_str("{\"event\":");
        push_json_string(&mut output, event);
        output.push_str(",\"severity\":\"");
        output.push_str(severity.as_str());
        output.push('"');

        let mut sorted: Vec<(&str, &str)> = fields.to_vec();
        if let Some(component) = &self.component {
            sorted.push(("component", &**component));
        }
        sorted.sort_by_key(|(k, _)| *k);

        for (key, value) in sorted {
            output.push(',');
            push_json_string(&mut output, key);
            output.push(':');
            push_json_string(&mut output, value);
        }

        output.push_str("}\n");
        output
    }

    /// Log at TRACE level
    pub fn trace(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Trace, event, fields);
    }

    /// Log at INFO level
    pub fn info(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Warn, event, fields);
    }

    /// Log at ERROR level
    pub fn error(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Error, event, fields);
    }

    /// Log at FATAL level
    pub fn fatal(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Fatal, event, fields);
    }
}

fn push_json_string(output: &mut String, value: &str) {
    match serde_json::to_string(value) {
        Ok(quoted) => output.push_str(&quoted),
        Err(_) => output.push_str("\"\""),
    }
}

fn write_line<W: Write>(writer: &mut W, line: &str) {
    // One write per line; logging failures never propagate.
    let _ = writer.write_all(line.as_bytes());
    let _ = writer.flush();
}

/// Handle to the lines written by a capturing [`Logger`].
#[derive(Debug, Clone)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Raw captured text.
    pub fn text(&self) -> String {
        let guard = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&guard).into_owned()
    }

    /// Captured lines parsed as JSON objects. Unparseable lines are skipped.
    pub fn lines(&self) -> Vec<serde_json::Value> {
        self.text()
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Captured lines whose `event` equals `event`.
    pub fn events(&self, event: &str) -> Vec<serde_json::Value> {
        self.lines()
            .into_iter()
            .filter(|line| line["event"] == event)
            .collect()
    }
}
