use std::collections::HashMap;
use std::sync::Arc;

use crate::types::SqlValue;

/// A row from a database query result
///
/// Column names and the name→index map are shared by every row of the same
/// [`ResultSet`](super::ResultSet).
#[derive(Debug, Clone)]
pub struct DbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub values: Vec<SqlValue>,
    #[doc(hidden)]
    pub(crate) column_index_cache: Arc<HashMap<String, usize>>,
}

impl DbRow {
    /// Create a new database row
    ///
    /// # Arguments
    ///
    /// * `column_names` - The column names
    /// * `values` - The values for this row
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<SqlValue>) -> Self {
        let cache = Arc::new(index_columns(&column_names));
        Self {
            column_names,
            values,
            column_index_cache: cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }

        // Catalog views upper-case unquoted aliases; fall back to a case-insensitive scan.
        self.column_names
            .iter()
            .position(|col| col.eq_ignore_ascii_case(column_name))
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Text value of a column; `None` for NULL or non-text values.
    #[must_use]
    pub fn text(&self, column_name: &str) -> Option<String> {
        self.get(column_name)
            .and_then(SqlValue::as_text)
            .map(str::to_string)
    }

    #[must_use]
    pub fn int(&self, column_name: &str) -> Option<i64> {
        self.get(column_name).and_then(SqlValue::as_int)
    }

    #[must_use]
    pub fn flag(&self, column_name: &str) -> bool {
        self.get(column_name)
            .and_then(|value| value.as_bool().or_else(|| value.as_int().map(|n| n > 0)))
            .unwrap_or(false)
    }
}

pub(super) fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    column_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}
