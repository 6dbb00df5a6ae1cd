use serde_json::{Map, Value};

mod parsers;
mod scanner;

use parsers::{
    is_block_comment_end, is_block_comment_start, is_cast_colon, is_escape_string_start,
    is_line_comment_start, matches_tag, try_start_dollar_quote,
};
use scanner::{State, scan_identifier};

use crate::types::RowValues;

/// Target placeholder style for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style placeholders like `$1`.
    Postgres,
    /// SQLite-style placeholders like `?1`.
    Sqlite,
}

impl PlaceholderStyle {
    fn push_marker(self, out: &mut String, position: usize) {
        out.push(match self {
            PlaceholderStyle::Postgres => '$',
            PlaceholderStyle::Sqlite => '?',
        });
        out.push_str(&position.to_string());
    }
}

/// A SQL template with its `:name` parameters rewritten to positional markers.
///
/// Computed once per template; [`TranslatedQuery::bind`] then produces the value
/// list for each parameter source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedQuery {
    sql: String,
    names: Vec<String>,
}

impl TranslatedQuery {
    /// The positional SQL.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Distinct parameter names in first-occurrence order; index `i` is position `i + 1`.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Values for each position, `Null` for names missing from `source`.
    #[must_use]
    pub fn bind(&self, source: &Map<String, Value>) -> Vec<RowValues> {
        self.names
            .iter()
            .map(|name| source.get(name).map_or(RowValues::Null, RowValues::from_json))
            .collect()
    }
}

/// A template bound against one parameter source.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBinding {
    pub query: TranslatedQuery,
    pub values: Vec<RowValues>,
}

impl ParameterBinding {
    #[must_use]
    pub fn new(sql: &str, source: &Map<String, Value>, style: PlaceholderStyle) -> Self {
        let query = translate_named(sql, style);
        let values = query.bind(source);
        Self { query, values }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        self.query.sql()
    }
}

/// Rewrite `:name` parameters into positional placeholders.
///
/// A colon starts a parameter only when it is followed by a word character and is
/// not part of a `::` cast. Quoted strings, quoted identifiers, comments, and
/// dollar-quoted bodies are copied through untouched.
/// ```rust
/// use sql_request_runner::prelude::*;
///
/// let query = translate_named("select :a::int, :b, :a", PlaceholderStyle::Postgres);
/// assert_eq!(query.sql(), "select $1::int, $2, $1");
/// assert_eq!(query.names(), ["a", "b"]);
/// ```
#[must_use]
pub fn translate_named(sql: &str, style: PlaceholderStyle) -> TranslatedQuery {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut names: Vec<String> = Vec::new();
    let mut copied = 0;
    let mut state = State::Normal;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' if is_escape_string_start(bytes, idx) => state = State::EscapeQuoted,
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                _ if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    idx += 1;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = advance;
                    }
                }
                b':' if is_cast_colon(bytes, idx) => {
                    if bytes.get(idx + 1) == Some(&b':') {
                        idx += 1;
                    }
                }
                b':' => {
                    if let Some(end) = scan_identifier(bytes, idx + 1) {
                        let name = &sql[idx + 1..end];
                        let position = match names.iter().position(|known| known == name) {
                            Some(existing) => existing + 1,
                            None => {
                                names.push(name.to_string());
                                names.len()
                            }
                        };
                        out.push_str(&sql[copied..idx]);
                        style.push_marker(&mut out, position);
                        copied = end;
                        idx = end - 1;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::EscapeQuoted => match b {
                b'\\' => idx += 1,
                b'\'' if bytes.get(idx + 1) == Some(&b'\'') => idx += 1,
                b'\'' => state = State::Normal,
                _ => {}
            },
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    if depth == 1 {
                        state = State::Normal;
                    } else {
                        state = State::BlockComment(depth - 1);
                    }
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    let tag_len = tag.len();
                    state = State::Normal;
                    idx += tag_len + 1;
                }
            }
        }

        idx += 1;
    }

    out.push_str(&sql[copied..]);
    TranslatedQuery { sql: out, names }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn repeated_names_share_a_position() {
        let query = translate_named(
            "select * from t where a = :a or b = :b or c = :a",
            PlaceholderStyle::Postgres,
        );
        assert_eq!(query.sql(), "select * from t where a = $1 or b = $2 or c = $1");
        assert_eq!(query.names(), ["a", "b"]);
    }

    #[test]
    fn sqlite_style_markers() {
        let query = translate_named("insert into t values(:x, :y)", PlaceholderStyle::Sqlite);
        assert_eq!(query.sql(), "insert into t values(?1, ?2)");
    }

    #[test]
    fn cast_is_not_a_parameter() {
        let binding = ParameterBinding::new(
            "SELECT :a::int AS x",
            &source(json!({"a": "5"})),
            PlaceholderStyle::Postgres,
        );
        assert_eq!(binding.sql(), "SELECT $1::int AS x");
        assert_eq!(binding.query.names(), ["a"]);
        assert_eq!(binding.values, vec![RowValues::Text("5".into())]);
    }

    #[test]
    fn colon_after_colon_is_never_a_parameter() {
        let query = translate_named("select x:::y, now()::date", PlaceholderStyle::Postgres);
        assert_eq!(query.sql(), "select x:::y, now()::date");
        assert!(query.names().is_empty());
    }

    #[test]
    fn missing_names_bind_null() {
        let binding = ParameterBinding::new(
            "select :present, :absent",
            &source(json!({"present": 1, "unused": true})),
            PlaceholderStyle::Postgres,
        );
        assert_eq!(binding.values, vec![RowValues::Int(1), RowValues::Null]);
    }

    #[test]
    fn names_are_case_sensitive() {
        let query = translate_named("select :Id, :id", PlaceholderStyle::Postgres);
        assert_eq!(query.sql(), "select $1, $2");
        assert_eq!(query.names(), ["Id", "id"]);
    }

    #[test]
    fn skips_literals_and_comments() {
        let sql = "select ':a', \"b:c\", :d -- :e\n/* :f /* :g */ */ from t where x = :d";
        let query = translate_named(sql, PlaceholderStyle::Postgres);
        assert_eq!(
            query.sql(),
            "select ':a', \"b:c\", $1 -- :e\n/* :f /* :g */ */ from t where x = $1"
        );
        assert_eq!(query.names(), ["d"]);
    }

    #[test]
    fn skips_dollar_quoted_blocks() {
        let sql = "select $body$ :inside $body$, :outside";
        let query = translate_named(sql, PlaceholderStyle::Postgres);
        assert_eq!(query.sql(), "select $body$ :inside $body$, $1");
    }

    #[test]
    fn escape_strings_hide_backslash_quotes() {
        let query = translate_named(r"select E'it\'s :no', :id", PlaceholderStyle::Postgres);
        assert_eq!(query.sql(), r"select E'it\'s :no', $1");
        assert_eq!(query.names(), ["id"]);

        let query = translate_named(r"select e'a\\', :x, 'b\', :y", PlaceholderStyle::Postgres);
        assert_eq!(query.sql(), r"select e'a\\', $1, 'b\', $2");
        assert_eq!(query.names(), ["x", "y"]);
    }

    #[test]
    fn identifier_ending_in_e_is_not_an_escape_prefix() {
        let query = translate_named(r"select name'x\', :id", PlaceholderStyle::Postgres);
        assert_eq!(query.sql(), r"select name'x\', $1");
    }

    #[test]
    fn keeps_multibyte_text_intact() {
        let sql = "select 'héllo', :naïve_ok, :b";
        let query = translate_named(sql, PlaceholderStyle::Sqlite);
        // `\w` is ASCII only, so the identifier stops before the multibyte char
        assert_eq!(query.sql(), "select 'héllo', ?1ïve_ok, ?2");
        assert_eq!(query.names(), ["na", "b"]);
    }

    #[test]
    fn translation_is_deterministic() {
        let sql = "update t set a = :a where id = :id and a <> :a";
        let params = source(json!({"a": 1, "id": 2}));
        let first = ParameterBinding::new(sql, &params, PlaceholderStyle::Postgres);
        let second = ParameterBinding::new(sql, &params, PlaceholderStyle::Postgres);
        assert_eq!(first, second);
    }

    #[test]
    fn bare_colon_is_left_alone() {
        let query = translate_named("select ': ', a := 1, :", PlaceholderStyle::Postgres);
        assert_eq!(query.sql(), "select ': ', a := 1, :");
    }
}
