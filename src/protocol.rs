//! Request protocol: one JSON document or newline-delimited JSON documents.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::SqlRunnerError;

/// What a request asks the engine to do.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Action {
    /// Run once, print all rows as one JSON array.
    Execute,
    /// Run once per item, print the collected rows or a summary.
    ExecuteBatch,
    /// Run once, print one row per line.
    Stream,
    /// Run once per item, print one row per line.
    StreamBatch,
    /// Anything else; rejected when dispatched.
    Unknown(String),
}

impl From<String> for Action {
    fn from(value: String) -> Self {
        match value.as_str() {
            "execute" => Action::Execute,
            "executeBatch" => Action::ExecuteBatch,
            "stream" => Action::Stream,
            "streamBatch" => Action::StreamBatch,
            _ => Action::Unknown(value),
        }
    }
}

impl Action {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Action::Execute => "execute",
            Action::ExecuteBatch => "executeBatch",
            Action::Stream => "stream",
            Action::StreamBatch => "streamBatch",
            Action::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    action: Action,
    sql: String,
    #[serde(default)]
    params: Option<Map<String, Value>>,
    #[serde(default)]
    items: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    tx: Option<bool>,
    #[serde(default)]
    ignore: Option<bool>,
}

/// One validated execution request. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct Request {
    action: Action,
    sql: String,
    params: Map<String, Value>,
    items: Option<Vec<Map<String, Value>>>,
    tx: bool,
    ignore: bool,
    raw: Map<String, Value>,
}

impl Request {
    /// Validate and convert one parsed JSON document.
    ///
    /// # Errors
    /// Returns `SqlRunnerError::ProtocolError` if the document is not an object with
    /// non-empty `action` and `sql`, or a known field has the wrong type.
    pub fn from_value(value: Value) -> Result<Self, SqlRunnerError> {
        validate_request(&value)?;
        let parsed = RawRequest::deserialize(&value)
            .map_err(|e| SqlRunnerError::ProtocolError(e.to_string()))?;
        let Value::Object(raw) = value else {
            return Err(SqlRunnerError::ProtocolError(
                "Request must be an object".to_string(),
            ));
        };

        Ok(Request {
            action: parsed.action,
            sql: parsed.sql,
            params: parsed.params.unwrap_or_default(),
            items: parsed.items,
            tx: parsed.tx.unwrap_or(false),
            ignore: parsed.ignore.unwrap_or(false),
            raw,
        })
    }

    /// Build a plain `execute` request from an SQL template and parameters.
    #[must_use]
    pub fn execute(sql: impl Into<String>, params: Map<String, Value>) -> Self {
        let sql = sql.into();
        let mut raw = Map::new();
        raw.insert("action".to_string(), Value::from("execute"));
        raw.insert("sql".to_string(), Value::from(sql.clone()));
        raw.insert("params".to_string(), Value::Object(params.clone()));
        Request {
            action: Action::Execute,
            sql,
            params,
            items: None,
            tx: false,
            ignore: false,
            raw,
        }
    }

    #[must_use]
    pub fn action(&self) -> &Action {
        &self.action
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    #[must_use]
    pub fn items(&self) -> Option<&[Map<String, Value>]> {
        self.items.as_deref()
    }

    #[must_use]
    pub fn tx(&self) -> bool {
        self.tx
    }

    #[must_use]
    pub fn ignore(&self) -> bool {
        self.ignore
    }

    /// The request document as received.
    #[must_use]
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

/// How the input was framed.
#[derive(Debug, Clone)]
pub enum ParsedInput {
    Single(Request),
    Ndjson(Vec<Request>),
}

impl ParsedInput {
    #[must_use]
    pub fn into_requests(self) -> Vec<Request> {
        match self {
            ParsedInput::Single(request) => vec![request],
            ParsedInput::Ndjson(requests) => requests,
        }
    }
}

/// Check the shape every request must have before it is deserialized.
///
/// # Errors
/// Returns `SqlRunnerError::ProtocolError` describing the first missing piece.
pub fn validate_request(value: &Value) -> Result<(), SqlRunnerError> {
    let Some(object) = value.as_object() else {
        return Err(SqlRunnerError::ProtocolError(
            "Request must be an object".to_string(),
        ));
    };
    if !is_non_empty_text(object.get("action")) {
        return Err(SqlRunnerError::ProtocolError(
            "Request must have an action property".to_string(),
        ));
    }
    if !is_non_empty_text(object.get("sql")) {
        return Err(SqlRunnerError::ProtocolError(
            "Request must have an sql property".to_string(),
        ));
    }
    Ok(())
}

fn is_non_empty_text(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if !s.is_empty())
}

fn parse_request(text: &str) -> Result<Request, SqlRunnerError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| SqlRunnerError::ProtocolError(e.to_string()))?;
    Request::from_value(value)
}

/// Parse trimmed input as one request document, falling back to NDJSON.
///
/// The NDJSON attempt only happens for multi-line input and must succeed for
/// every line; otherwise the single-document error is returned.
///
/// # Errors
/// Returns `SqlRunnerError::ProtocolError` carrying the single-document failure.
pub fn parse_input(trimmed: &str) -> Result<ParsedInput, SqlRunnerError> {
    let single_error = match parse_request(trimmed) {
        Ok(request) => return Ok(ParsedInput::Single(request)),
        Err(e) => e,
    };

    let lines: Vec<&str> = trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.len() > 1 {
        match lines
            .iter()
            .map(|line| parse_request(line))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(requests) => return Ok(ParsedInput::Ndjson(requests)),
            Err(ndjson_error) => {
                tracing::debug!("ndjson fallback failed: {ndjson_error}");
            }
        }
    }

    Err(single_error)
}
