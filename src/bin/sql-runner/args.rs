use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde_json::{Map, Value};
use sql_request_runner::{ConnectionConfig, DatabaseType};
use tracing::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run named-parameter SQL requests read as JSON or NDJSON from stdin"
)]
pub(crate) struct Args {
    #[arg(long, value_enum, default_value = "postgres")]
    pub(crate) backend: DatabaseType,
    #[arg(long, default_value = "localhost")]
    pub(crate) host: String,
    #[arg(long, default_value_t = 5432)]
    pub(crate) port: u16,
    /// Database name, or the database file for `--backend sqlite`.
    #[arg(long, default_value = "template1")]
    pub(crate) database: String,
    #[arg(long, default_value = "postgres")]
    pub(crate) user: String,
    #[arg(long)]
    pub(crate) password: Option<String>,
    #[arg(long, value_parser = humantime::parse_duration)]
    pub(crate) connect_timeout: Option<Duration>,
    /// Write logs to this file. Nothing is logged without it.
    #[arg(long)]
    pub(crate) log: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "info")]
    pub(crate) log_level: LogLevel,
    /// Run this statement once instead of reading requests from stdin.
    #[arg(long)]
    pub(crate) sql: Option<String>,
    /// `name=value` parameter for `--sql`; repeatable.
    #[arg(long = "param", value_parser = parse_param, requires = "sql")]
    pub(crate) params: Vec<(String, Value)>,
}

impl Args {
    pub(crate) fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            db_type: self.backend,
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            connect_timeout: self.connect_timeout,
        }
    }

    pub(crate) fn param_map(&self) -> Map<String, Value> {
        self.params.iter().cloned().collect()
    }
}

/// Parse `name=value`. The value is taken as a JSON scalar when it is one
/// (`5`, `true`, `null`) and as a plain string otherwise.
fn parse_param(raw: &str) -> Result<(String, Value), String> {
    let Some((name, value)) = raw.split_once('=') else {
        return Err(format!("expected name=value, got `{raw}`"));
    };
    if name.is_empty() {
        return Err(format!("missing parameter name in `{raw}`"));
    }
    let value = match serde_json::from_str::<Value>(value) {
        Ok(parsed) if !parsed.is_object() && !parsed.is_array() => parsed,
        _ => Value::String(value.to_string()),
    };
    Ok((name.to_string(), value))
}
