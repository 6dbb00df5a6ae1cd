use std::time::Duration;

use crate::error::SqlRunnerError;
use crate::types::DatabaseType;

/// Where requests are executed.
///
/// For `SQLite`, `database` is the database file path and the network fields are
/// unused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub db_type: DatabaseType,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    pub connect_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            db_type: DatabaseType::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            database: "template1".to_string(),
            user: "postgres".to_string(),
            password: None,
            connect_timeout: None,
        }
    }
}

impl ConnectionConfig {
    /// `SQLite` configuration for the database file at `path`.
    #[must_use]
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            db_type: DatabaseType::Sqlite,
            database: path.into(),
            ..Self::default()
        }
    }

    /// Check that every field the backend needs is present.
    ///
    /// # Errors
    /// Returns `SqlRunnerError::ConfigError` naming the first missing field.
    pub fn validate(&self) -> Result<(), SqlRunnerError> {
        if self.database.is_empty() {
            return Err(SqlRunnerError::ConfigError(
                "database is required".to_string(),
            ));
        }
        if self.db_type == DatabaseType::Postgres {
            if self.host.is_empty() {
                return Err(SqlRunnerError::ConfigError("host is required".to_string()));
            }
            if self.port == 0 {
                return Err(SqlRunnerError::ConfigError("port is required".to_string()));
            }
            if self.user.is_empty() {
                return Err(SqlRunnerError::ConfigError("user is required".to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_local_server() {
        let config = ConnectionConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.user, "postgres");
        assert_eq!(config.database, "template1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_missing_fields() {
        let config = ConnectionConfig {
            host: String::new(),
            ..ConnectionConfig::default()
        };
        let err = config.validate().expect_err("host missing");
        assert_eq!(err.to_string(), "Configuration error: host is required");

        let config = ConnectionConfig::sqlite("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn sqlite_ignores_network_fields() {
        let config = ConnectionConfig {
            user: String::new(),
            ..ConnectionConfig::sqlite("/tmp/x.db")
        };
        assert!(config.validate().is_ok());
    }
}
