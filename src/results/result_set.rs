use std::sync::Arc;

use super::row::CustomDbRow;
use crate::types::RowValues;

/// The rows returned by one statement execution.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Option<Arc<Vec<String>>>,
}

impl ResultSet {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            column_names: None,
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_names = Some(column_names);
    }

    /// Add a row to the result set.
    ///
    /// Rows added before any column names are set get an empty name list.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        let column_names = self
            .column_names
            .get_or_insert_with(|| Arc::new(Vec::new()))
            .clone();
        self.results.push(CustomDbRow::new(column_names, row_values));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Consume the result set, keeping only its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<CustomDbRow> {
        self.results
    }
}
