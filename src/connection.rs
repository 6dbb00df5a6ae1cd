use async_trait::async_trait;

use crate::config::ConnectionConfig;
use crate::error::SqlRunnerError;
use crate::results::{CustomDbRow, ResultSet};
use crate::translation::PlaceholderStyle;
use crate::types::{DatabaseType, RowValues};

#[cfg(feature = "postgres")]
use crate::postgres::PostgresConnector;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteConnector;

/// Row callback used by [`Connection::query_each`].
pub type RowSink<'a> = dyn FnMut(CustomDbRow) -> Result<(), SqlRunnerError> + Send + 'a;

/// One open database session.
#[async_trait]
pub trait Connection: Send {
    /// Placeholder syntax this backend expects in positional SQL.
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Run one positional statement and collect its rows.
    async fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlRunnerError>;

    /// Run one positional statement, handing rows to `on_row` in order.
    ///
    /// Returns the number of rows delivered. Backends that can read rows off the
    /// wire incrementally override this; the default collects first.
    async fn query_each(
        &mut self,
        sql: &str,
        params: &[RowValues],
        on_row: &mut RowSink<'_>,
    ) -> Result<usize, SqlRunnerError> {
        let rows = self.query(sql, params).await?.into_rows();
        let count = rows.len();
        for row in rows {
            on_row(row)?;
        }
        Ok(count)
    }

    async fn begin(&mut self) -> Result<(), SqlRunnerError>;

    async fn commit(&mut self) -> Result<(), SqlRunnerError>;

    async fn rollback(&mut self) -> Result<(), SqlRunnerError>;

    /// Close the session.
    async fn release(self: Box<Self>) -> Result<(), SqlRunnerError>;
}

/// Opens a fresh [`Connection`] per request.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Connection>, SqlRunnerError>;
}

/// Connector for whichever backend the configuration names.
#[derive(Debug, Clone)]
pub enum AnyConnector {
    #[cfg(feature = "postgres")]
    Postgres(PostgresConnector),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteConnector),
}

impl AnyConnector {
    /// Build the connector for `config.db_type`.
    ///
    /// # Errors
    /// Returns `SqlRunnerError::ConfigError` for an incomplete configuration, or
    /// `SqlRunnerError::Unimplemented` if the backend was compiled out.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, SqlRunnerError> {
        config.validate()?;
        match config.db_type {
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => Ok(AnyConnector::Postgres(PostgresConnector::new(config))),
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => Ok(AnyConnector::Sqlite(SqliteConnector::new(
                config.database.clone(),
            ))),
            #[allow(unreachable_patterns)]
            other => Err(SqlRunnerError::Unimplemented(format!(
                "{other:?} support is not enabled in this build"
            ))),
        }
    }
}

#[async_trait]
impl Connector for AnyConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, SqlRunnerError> {
        match self {
            #[cfg(feature = "postgres")]
            AnyConnector::Postgres(connector) => connector.connect().await,
            #[cfg(feature = "sqlite")]
            AnyConnector::Sqlite(connector) => connector.connect().await,
        }
    }
}
