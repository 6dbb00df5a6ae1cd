use std::io::Write;

use serde_json::{Map, Value};

use super::single::stream_statement;
use crate::connection::Connection;
use crate::error::SqlRunnerError;
use crate::protocol::Request;
use crate::report::{ErrorRecord, Reporter, RequestOutcome};
use crate::results::CustomDbRow;
use crate::translation::translate_named;

/// `executeBatch`: run the template once per item.
///
/// With `tx` the whole batch commits or rolls back together and the first
/// failure stops it. Without `tx` every item runs; `ignore` then decides
/// whether rows are printed eagerly next to the collected errors.
///
/// # Errors
/// Returns an error only if writing to the reporter fails.
pub async fn execute_batch<O, E>(
    conn: &mut dyn Connection,
    request: &Request,
    items: &[Map<String, Value>],
    reporter: &mut Reporter<O, E>,
) -> Result<RequestOutcome, SqlRunnerError>
where
    O: Write + Send,
    E: Write + Send,
{
    tracing::debug!(
        sql = request.sql(),
        items = items.len(),
        tx = request.tx(),
        ignore = request.ignore(),
        "executeBatch"
    );
    if request.tx() {
        execute_batch_tx(conn, request, items, reporter).await
    } else if request.ignore() {
        execute_batch_eager(conn, request, items, reporter).await
    } else {
        execute_batch_collected(conn, request, items, reporter).await
    }
}

async fn execute_batch_tx<O, E>(
    conn: &mut dyn Connection,
    request: &Request,
    items: &[Map<String, Value>],
    reporter: &mut Reporter<O, E>,
) -> Result<RequestOutcome, SqlRunnerError>
where
    O: Write + Send,
    E: Write + Send,
{
    let query = translate_named(request.sql(), conn.placeholder_style());
    if let Err(e) = conn.begin().await {
        reporter.emit_errors(&[ErrorRecord::new(None, Some(request.sql()), e)])?;
        return Ok(RequestOutcome::failed(request.ignore()));
    }

    let mut rows: Vec<CustomDbRow> = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match conn.query(query.sql(), &query.bind(item)).await {
            Ok(result_set) => rows.extend(result_set.into_rows()),
            Err(e) => {
                tracing::debug!(index, "batch item failed, rolling back");
                rollback_quietly(conn).await;
                reporter.emit_errors(&[ErrorRecord::new(Some(item), Some(request.sql()), e)])?;
                return Ok(RequestOutcome::failed(request.ignore()));
            }
        }
    }

    if let Err(e) = conn.commit().await {
        rollback_quietly(conn).await;
        reporter.emit_errors(&[ErrorRecord::new(None, Some(request.sql()), e)])?;
        return Ok(RequestOutcome::failed(request.ignore()));
    }

    emit_rows_or_summary(reporter, &rows, items.len())?;
    Ok(RequestOutcome::Success)
}

async fn execute_batch_collected<O, E>(
    conn: &mut dyn Connection,
    request: &Request,
    items: &[Map<String, Value>],
    reporter: &mut Reporter<O, E>,
) -> Result<RequestOutcome, SqlRunnerError>
where
    O: Write + Send,
    E: Write + Send,
{
    let query = translate_named(request.sql(), conn.placeholder_style());
    let mut rows: Vec<CustomDbRow> = Vec::new();
    let mut errors: Vec<ErrorRecord> = Vec::new();

    for item in items {
        match conn.query(query.sql(), &query.bind(item)).await {
            Ok(result_set) => rows.extend(result_set.into_rows()),
            Err(e) => errors.push(ErrorRecord::new(Some(item), Some(request.sql()), e)),
        }
    }

    if !errors.is_empty() {
        reporter.emit_errors(&errors)?;
        return Ok(RequestOutcome::Fatal);
    }
    emit_rows_or_summary(reporter, &rows, items.len())?;
    Ok(RequestOutcome::Success)
}

async fn execute_batch_eager<O, E>(
    conn: &mut dyn Connection,
    request: &Request,
    items: &[Map<String, Value>],
    reporter: &mut Reporter<O, E>,
) -> Result<RequestOutcome, SqlRunnerError>
where
    O: Write + Send,
    E: Write + Send,
{
    let query = translate_named(request.sql(), conn.placeholder_style());
    let mut errors: Vec<ErrorRecord> = Vec::new();
    let mut printed = false;

    for item in items {
        match conn.query(query.sql(), &query.bind(item)).await {
            Ok(result_set) if !result_set.is_empty() => {
                reporter.emit_rows(&result_set.results)?;
                printed = true;
            }
            Ok(_) => {}
            Err(e) => errors.push(ErrorRecord::new(Some(item), Some(request.sql()), e)),
        }
    }

    if !errors.is_empty() {
        reporter.emit_errors(&errors)?;
        return Ok(RequestOutcome::Recovered);
    }
    if !printed {
        reporter.emit_summary(items.len())?;
    }
    Ok(RequestOutcome::Success)
}

/// `streamBatch`: run the template once per item, printing rows one per line.
///
/// Each failing item is reported on its own as soon as it fails. Under `tx` the
/// first failure rolls back and stops the batch.
///
/// # Errors
/// Returns an error only if writing to the reporter fails.
pub async fn stream_batch<O, E>(
    conn: &mut dyn Connection,
    request: &Request,
    items: &[Map<String, Value>],
    reporter: &mut Reporter<O, E>,
) -> Result<RequestOutcome, SqlRunnerError>
where
    O: Write + Send,
    E: Write + Send,
{
    tracing::debug!(
        sql = request.sql(),
        items = items.len(),
        tx = request.tx(),
        ignore = request.ignore(),
        "streamBatch"
    );
    let query = translate_named(request.sql(), conn.placeholder_style());

    if request.tx() {
        if let Err(e) = conn.begin().await {
            reporter.emit_error(&ErrorRecord::new(None, Some(request.sql()), e))?;
            return Ok(RequestOutcome::failed(request.ignore()));
        }
        for (index, item) in items.iter().enumerate() {
            if let Err(e) = stream_statement(conn, query.sql(), &query.bind(item), reporter).await? {
                tracing::debug!(index, "stream batch item failed, rolling back");
                rollback_quietly(conn).await;
                reporter.emit_error(&ErrorRecord::new(Some(item), Some(request.sql()), e))?;
                return Ok(RequestOutcome::failed(request.ignore()));
            }
        }
        if let Err(e) = conn.commit().await {
            rollback_quietly(conn).await;
            reporter.emit_error(&ErrorRecord::new(None, Some(request.sql()), e))?;
            return Ok(RequestOutcome::failed(request.ignore()));
        }
        return Ok(RequestOutcome::Success);
    }

    let mut failed = false;
    for item in items {
        if let Err(e) = stream_statement(conn, query.sql(), &query.bind(item), reporter).await? {
            reporter.emit_error(&ErrorRecord::new(Some(item), Some(request.sql()), e))?;
            failed = true;
        }
    }
    if failed {
        Ok(RequestOutcome::failed(request.ignore()))
    } else {
        Ok(RequestOutcome::Success)
    }
}

fn emit_rows_or_summary<O: Write, E: Write>(
    reporter: &mut Reporter<O, E>,
    rows: &[CustomDbRow],
    item_count: usize,
) -> Result<(), SqlRunnerError> {
    if rows.is_empty() {
        reporter.emit_summary(item_count)
    } else {
        reporter.emit_rows(rows)
    }
}

/// Roll back, logging instead of reporting a failure so the statement error
/// that caused the rollback is the one the caller sees.
async fn rollback_quietly(conn: &mut dyn Connection) {
    if let Err(e) = conn.rollback().await {
        tracing::warn!("rollback failed: {e}");
    }
}
