use std::time::Duration;

use super::connection::{SqliteConnection, run_blocking_owned};
use crate::connection::Connection;
use crate::error::SqlRunnerError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the database file at `db_path` once per request.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    db_path: String,
}

impl SqliteConnector {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self { db_path }
    }

    #[must_use]
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Open the database file, creating it if needed.
    ///
    /// # Errors
    /// Returns `SqlRunnerError::ConnectionError` if the file cannot be opened.
    pub async fn connect(&self) -> Result<Box<dyn Connection>, SqlRunnerError> {
        let path = self.db_path.clone();
        let conn = run_blocking_owned(move || {
            let conn = rusqlite::Connection::open(&path)?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            Ok(conn)
        })
        .await
        .map_err(|e| SqlRunnerError::ConnectionError(e.to_string()))?;
        tracing::debug!(path = %self.db_path, "sqlite connection opened");
        Ok(Box::new(SqliteConnection::new(conn)))
    }
}
