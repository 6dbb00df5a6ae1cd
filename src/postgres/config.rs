use tokio_postgres::{Config as PgConfig, NoTls};

use super::executor::PostgresConnection;
use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::SqlRunnerError;

/// Opens one unpooled `tokio-postgres` session per request.
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    config: PgConfig,
}

impl PostgresConnector {
    #[must_use]
    pub fn new(config: &ConnectionConfig) -> Self {
        let mut pg_config = PgConfig::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.user);
        if let Some(password) = &config.password {
            pg_config.password(password);
        }
        if let Some(timeout) = config.connect_timeout {
            pg_config.connect_timeout(timeout);
        }
        Self { config: pg_config }
    }

    /// Connect and spawn the connection driver task.
    ///
    /// # Errors
    /// Returns `SqlRunnerError::ConnectionError` if the server cannot be reached or
    /// rejects the session.
    pub async fn connect(&self) -> Result<Box<dyn Connection>, SqlRunnerError> {
        let (client, connection) = self.config.connect(NoTls).await.map_err(|e| {
            let message = e
                .as_db_error()
                .map_or_else(|| e.to_string(), |db| db.message().to_string());
            SqlRunnerError::ConnectionError(message)
        })?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!("postgres connection error: {e}");
            }
        });
        tracing::debug!("postgres connection opened");

        Ok(Box::new(PostgresConnection::new(client, driver)))
    }
}
