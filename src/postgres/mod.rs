// PostgreSQL backend
//
// - config: connector built from `ConnectionConfig`
// - params: text-format parameter encoding
// - query: row value extraction
// - executor: the `Connection` implementation

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::PostgresConnector;
pub use executor::PostgresConnection;
pub use query::build_result_set_from_rows;

use crate::error::SqlRunnerError;

/// Reduce a driver error to the server's message when there is one.
pub(crate) fn statement_error(err: tokio_postgres::Error) -> SqlRunnerError {
    match err.as_db_error() {
        Some(db) => SqlRunnerError::ExecutionError(db.message().to_string()),
        None => SqlRunnerError::PostgresError(err),
    }
}
