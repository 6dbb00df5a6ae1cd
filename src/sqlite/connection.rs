use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::params::Params;
use super::query::build_result_set;
use crate::connection::Connection;
use crate::error::SqlRunnerError;
use crate::results::ResultSet;
use crate::translation::PlaceholderStyle;
use crate::types::RowValues;

pub(crate) type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// Connection wrapper that moves every blocking rusqlite call onto the
/// blocking thread pool.
pub struct SqliteConnection {
    conn: SharedSqliteConnection,
}

impl SqliteConnection {
    pub(crate) fn new(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `func` against the underlying rusqlite connection.
    ///
    /// # Errors
    /// Returns whatever `func` returns, or `SqlRunnerError::ExecutionError` if the
    /// blocking task fails to join.
    pub async fn with_connection<F, R>(&self, func: F) -> Result<R, SqlRunnerError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlRunnerError> + Send + 'static,
        R: Send + 'static,
    {
        run_blocking(Arc::clone(&self.conn), func).await
    }

    async fn simple(&self, sql: &'static str) -> Result<(), SqlRunnerError> {
        self.with_connection(move |conn| Ok(conn.execute_batch(sql)?))
            .await
    }
}

pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, SqlRunnerError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, SqlRunnerError> + Send + 'static,
    R: Send + 'static,
{
    run_blocking_owned(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
}

pub(crate) async fn run_blocking_owned<F, R>(func: F) -> Result<R, SqlRunnerError>
where
    F: FnOnce() -> Result<R, SqlRunnerError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(func).await.map_err(|e| {
        SqlRunnerError::ExecutionError(format!("sqlite spawn_blocking join error: {e}"))
    })?
}

#[async_trait]
impl Connection for SqliteConnection {
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Sqlite
    }

    async fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlRunnerError> {
        let sql = sql.to_string();
        let params = Params::convert(params);
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            build_result_set(&mut stmt, params.as_values())
        })
        .await
    }

    async fn begin(&mut self) -> Result<(), SqlRunnerError> {
        self.simple("BEGIN").await
    }

    async fn commit(&mut self) -> Result<(), SqlRunnerError> {
        self.simple("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), SqlRunnerError> {
        self.simple("ROLLBACK").await
    }

    async fn release(self: Box<Self>) -> Result<(), SqlRunnerError> {
        let conn = self.conn;
        run_blocking_owned(move || {
            let conn = Arc::try_unwrap(conn)
                .map_err(|_| {
                    SqlRunnerError::ConnectionError("sqlite connection is still shared".to_string())
                })?
                .into_inner();
            conn.close().map_err(|(_, e)| SqlRunnerError::SqliteError(e))
        })
        .await
    }
}
