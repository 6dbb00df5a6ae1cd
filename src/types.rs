
use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

/// Values that can be bound as query parameters or read back from a result row.
///
/// Request parameters arrive as JSON scalars and are mapped with
/// [`RowValues::from_json`]; rows go back out through the `Serialize` impl.
/// ```rust
/// use serde_json::json;
/// use sql_request_runner::prelude::*;
///
/// assert_eq!(RowValues::from_json(&json!(7)), RowValues::Int(7));
/// assert_eq!(RowValues::from_json(&json!("alice")), RowValues::Text("alice".into()));
/// assert!(RowValues::from_json(&json!(null)).is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value (arrays and objects)
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Map a JSON request value onto a bindable value.
    ///
    /// Integers that fit in `i64` stay integral; every other number becomes a float.
    #[must_use]
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => RowValues::Null,
            JsonValue::Bool(b) => RowValues::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => RowValues::Int(i),
                None => n.as_f64().map_or(RowValues::Null, RowValues::Float),
            },
            JsonValue::String(s) => RowValues::Text(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => RowValues::JSON(value.clone()),
        }
    }

    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }
}

/// Hex-encode bytes the way PostgreSQL prints `bytea` (`\x0a1b`).
#[must_use]
pub fn hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    out.extend(bytes.iter().map(|b| format!("{b:02x}")));
    out
}

impl Serialize for RowValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RowValues::Int(i) => serializer.serialize_i64(*i),
            RowValues::Float(f) => serializer.serialize_f64(*f),
            RowValues::Text(s) => serializer.serialize_str(s),
            RowValues::Bool(b) => serializer.serialize_bool(*b),
            RowValues::Timestamp(dt) => {
                serializer.collect_str(&dt.format("%Y-%m-%dT%H:%M:%S%.f"))
            }
            RowValues::Null => serializer.serialize_unit(),
            RowValues::JSON(value) => value.serialize(serializer),
            RowValues::Blob(bytes) => serializer.serialize_str(&hex_bytes(bytes)),
        }
    }
}

/// The database backends a connector can be built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum DatabaseType {
    /// `PostgreSQL` database
    Postgres,
    /// `SQLite` database file
    Sqlite,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_numbers_keep_integer_precision() {
        assert_eq!(RowValues::from_json(&json!(42)), RowValues::Int(42));
        assert_eq!(RowValues::from_json(&json!(1.5)), RowValues::Float(1.5));
        assert_eq!(
            RowValues::from_json(&json!(u64::MAX)),
            RowValues::Float(u64::MAX as f64)
        );
    }

    #[test]
    fn json_containers_bind_as_json() {
        let value = json!({"a": [1, 2]});
        assert_eq!(RowValues::from_json(&value), RowValues::JSON(value.clone()));
    }

    #[test]
    fn serializes_back_to_json() {
        let ts = NaiveDateTime::parse_from_str("2024-05-01 10:11:12", "%Y-%m-%d %H:%M:%S")
            .expect("timestamp");
        let values = vec![
            RowValues::Int(1),
            RowValues::Text("x".into()),
            RowValues::Null,
            RowValues::Timestamp(ts),
            RowValues::Blob(vec![0x0a, 0xff]),
        ];
        let out = serde_json::to_value(&values).expect("serialize");
        assert_eq!(out, json!([1, "x", null, "2024-05-01T10:11:12", "\\x0aff"]));
    }

    #[test]
    fn hex_bytes_matches_bytea_output() {
        assert_eq!(hex_bytes(&[]), "\\x");
        assert_eq!(hex_bytes(&[0x00, 0x1b, 0xa0]), "\\x001ba0");
    }
}
