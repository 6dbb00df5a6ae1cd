use std::io::Write;

use serde_json::{Map, Value};

use crate::connection::Connection;
use crate::error::SqlRunnerError;
use crate::protocol::Request;
use crate::report::{ErrorRecord, Reporter, RequestOutcome};
use crate::results::{CustomDbRow, ResultSet};
use crate::translation::ParameterBinding;
use crate::types::RowValues;

/// Run a named-parameter statement once and return its rows.
///
/// # Errors
/// Returns the backend error if the statement fails.
pub async fn execute_named(
    conn: &mut dyn Connection,
    sql: &str,
    params: &Map<String, Value>,
) -> Result<ResultSet, SqlRunnerError> {
    let binding = ParameterBinding::new(sql, params, conn.placeholder_style());
    conn.query(binding.sql(), &binding.values).await
}

/// `execute`: print every row as one JSON array.
///
/// # Errors
/// Returns an error only if writing to the reporter fails.
pub async fn execute<O, E>(
    conn: &mut dyn Connection,
    request: &Request,
    reporter: &mut Reporter<O, E>,
) -> Result<RequestOutcome, SqlRunnerError>
where
    O: Write + Send,
    E: Write + Send,
{
    tracing::debug!(sql = request.sql(), "execute");
    match execute_named(conn, request.sql(), request.params()).await {
        Ok(result_set) => {
            reporter.emit_rows(&result_set.results)?;
            Ok(RequestOutcome::Success)
        }
        Err(e) => {
            reporter.emit_error(&ErrorRecord::new(
                Some(request.params()),
                Some(request.sql()),
                e,
            ))?;
            Ok(RequestOutcome::failed(request.ignore()))
        }
    }
}

/// `stream`: print each row as its own JSON document as it arrives.
///
/// # Errors
/// Returns an error only if writing to the reporter fails.
pub async fn stream<O, E>(
    conn: &mut dyn Connection,
    request: &Request,
    reporter: &mut Reporter<O, E>,
) -> Result<RequestOutcome, SqlRunnerError>
where
    O: Write + Send,
    E: Write + Send,
{
    let binding = ParameterBinding::new(request.sql(), request.params(), conn.placeholder_style());
    tracing::debug!(sql = request.sql(), "stream");
    match stream_statement(conn, binding.sql(), &binding.values, reporter).await? {
        Ok(count) => {
            tracing::debug!(rows = count, "stream finished");
            Ok(RequestOutcome::Success)
        }
        Err(e) => {
            reporter.emit_error(&ErrorRecord::new(
                Some(request.params()),
                Some(request.sql()),
                e,
            ))?;
            Ok(RequestOutcome::failed(request.ignore()))
        }
    }
}

/// Run one positional statement, emitting rows as they are produced.
///
/// The outer result is the output channel, the inner one the statement. Rows
/// already written stay written when the statement fails part way.
pub(crate) async fn stream_statement<O, E>(
    conn: &mut dyn Connection,
    sql: &str,
    values: &[RowValues],
    reporter: &mut Reporter<O, E>,
) -> Result<Result<usize, SqlRunnerError>, SqlRunnerError>
where
    O: Write + Send,
    E: Write + Send,
{
    let mut output_error: Option<SqlRunnerError> = None;
    let mut on_row = |row: CustomDbRow| {
        reporter.emit_row(&row).map_err(|e| {
            let message = format!("failed to write row: {e}");
            output_error = Some(e);
            SqlRunnerError::ExecutionError(message)
        })
    };
    let result = conn.query_each(sql, values, &mut on_row).await;
    if let Some(e) = output_error {
        return Err(e);
    }
    Ok(result)
}
