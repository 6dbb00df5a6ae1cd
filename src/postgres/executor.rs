use std::sync::Arc;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use tokio::task::JoinHandle;
use tokio_postgres::Client;

use super::params::Params;
use super::query::{build_result_set_from_rows, postgres_extract_row};
use super::statement_error;
use crate::connection::{Connection, RowSink};
use crate::error::SqlRunnerError;
use crate::results::{CustomDbRow, ResultSet};
use crate::translation::PlaceholderStyle;
use crate::types::RowValues;

/// A live `tokio-postgres` client plus the task driving its socket.
pub struct PostgresConnection {
    client: Client,
    driver: JoinHandle<()>,
}

impl PostgresConnection {
    pub(crate) fn new(client: Client, driver: JoinHandle<()>) -> Self {
        Self { client, driver }
    }

    async fn simple(&self, sql: &str) -> Result<(), SqlRunnerError> {
        self.client.batch_execute(sql).await.map_err(statement_error)
    }
}

#[async_trait]
impl Connection for PostgresConnection {
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Postgres
    }

    async fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlRunnerError> {
        let converted = Params::convert(params);
        let rows = self
            .client
            .query(sql, converted.as_refs())
            .await
            .map_err(statement_error)?;
        build_result_set_from_rows(&rows)
    }

    async fn query_each(
        &mut self,
        sql: &str,
        params: &[RowValues],
        on_row: &mut RowSink<'_>,
    ) -> Result<usize, SqlRunnerError> {
        let stream = self
            .client
            .query_raw(sql, params.iter())
            .await
            .map_err(statement_error)?;
        let mut stream = std::pin::pin!(stream);

        let mut column_names: Option<Arc<Vec<String>>> = None;
        let mut count = 0;
        while let Some(row) = stream.try_next().await.map_err(statement_error)? {
            let names = column_names
                .get_or_insert_with(|| {
                    Arc::new(row.columns().iter().map(|c| c.name().to_string()).collect())
                })
                .clone();
            on_row(CustomDbRow::new(names, postgres_extract_row(&row)?))?;
            count += 1;
        }
        Ok(count)
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
        let PostgresConnection { client, driver } = *self;
        drop(client);
        driver.await.map_err(|e| {
            SqlRunnerError::ConnectionError(format!("postgres connection task failed: {e}"))
        })
    }
}
