use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::RowValues;

/// A row from a query result.
///
/// Column names are shared across every row of a result set. The row
/// serializes as a JSON object whose keys follow the column order.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomDbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub rows: Vec<RowValues>,
}

impl CustomDbRow {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, rows: Vec<RowValues>) -> Self {
        Self { column_names, rows }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.rows.get(idx))
    }

    fn is_shadowed(&self, idx: usize) -> bool {
        let name = &self.column_names[idx];
        self.column_names[idx + 1..].iter().any(|later| later == name)
    }
}

impl Serialize for CustomDbRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (idx, value) in self.rows.iter().enumerate() {
            // a repeated column name keeps only its last value
            if idx >= self.column_names.len() || self.is_shadowed(idx) {
                continue;
            }
            map.serialize_entry(&self.column_names[idx], value)?;
        }
        map.end()
    }
}
