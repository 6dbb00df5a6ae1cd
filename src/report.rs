//! Output channels, error records, and the outcome types that decide the exit code.

use std::fmt::Display;
use std::io::Write;

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::SqlRunnerError;
use crate::results::CustomDbRow;

/// Top-level keys that carry engine or host settings rather than SQL parameters.
pub const RESERVED_KEYS: &[&str] = &[
    "host",
    "port",
    "database",
    "user",
    "password",
    "action",
    "sql",
    "items",
    "inputStream",
    "tx",
    "ignore",
    "aux4HomeDir",
    "configDir",
    "packageDir",
    "query",
    "file",
];

/// Copy of `params` without any reserved key.
#[must_use]
pub fn strip_reserved(params: &Map<String, Value>) -> Map<String, Value> {
    params
        .iter()
        .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// One reported failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub item: Option<Map<String, Value>>,
    pub query: String,
    pub error: String,
}

impl ErrorRecord {
    /// Build a record; `item` is stripped of reserved keys and an empty or
    /// missing query is reported as `"unknown"`.
    #[must_use]
    pub fn new(item: Option<&Map<String, Value>>, query: Option<&str>, error: impl Display) -> Self {
        Self {
            item: item.map(strip_reserved),
            query: match query {
                Some(sql) if !sql.is_empty() => sql.to_string(),
                _ => "unknown".to_string(),
            },
            error: error.to_string(),
        }
    }
}

/// How one request ended, as far as the process exit code is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Everything ran.
    Success,
    /// Errors were reported but the request asked to ignore them.
    Recovered,
    /// Errors were reported and the process must fail.
    Fatal,
}

impl RequestOutcome {
    /// Outcome for a reported statement failure under the request's ignore flag.
    #[must_use]
    pub fn failed(ignore: bool) -> Self {
        if ignore {
            RequestOutcome::Recovered
        } else {
            RequestOutcome::Fatal
        }
    }

    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(self, RequestOutcome::Fatal)
    }
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
    EmptyInput,
}

impl ExitStatus {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
            ExitStatus::EmptyInput => 4,
        }
    }
}

/// Writes success payloads to one channel and error records to the other.
///
/// Every payload is a single line of JSON, flushed as soon as it is written so
/// streamed rows become visible immediately.
pub struct Reporter<O: Write, E: Write> {
    out: O,
    err: E,
}

impl Reporter<std::io::Stdout, std::io::Stderr> {
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(std::io::stdout(), std::io::stderr())
    }
}

impl<O: Write, E: Write> Reporter<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    /// Consume the reporter and hand back both channels.
    pub fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }

    /// Print a row sequence as one JSON array.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn emit_rows(&mut self, rows: &[CustomDbRow]) -> Result<(), SqlRunnerError> {
        write_line(&mut self.out, rows)
    }

    /// Print one row as its own JSON document.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn emit_row(&mut self, row: &CustomDbRow) -> Result<(), SqlRunnerError> {
        write_line(&mut self.out, row)
    }

    /// Print the `{"success":true,"count":n}` aggregate.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn emit_summary(&mut self, count: usize) -> Result<(), SqlRunnerError> {
        write_line(&mut self.out, &json!({ "success": true, "count": count }))
    }

    /// Report one error record as a bare object.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn emit_error(&mut self, record: &ErrorRecord) -> Result<(), SqlRunnerError> {
        tracing::debug!(query = %record.query, error = %record.error, "reporting error");
        write_line(&mut self.err, record)
    }

    /// Report a list of error records as one JSON array.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn emit_errors(&mut self, records: &[ErrorRecord]) -> Result<(), SqlRunnerError> {
        tracing::debug!(count = records.len(), "reporting errors");
        write_line(&mut self.err, records)
    }
}

fn write_line<W: Write, T: Serialize + ?Sized>(
    writer: &mut W,
    payload: &T,
) -> Result<(), SqlRunnerError> {
    serde_json::to_writer(&mut *writer, payload)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
