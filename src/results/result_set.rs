use std::collections::HashMap;
use std::sync::Arc;

use super::row::{DbRow, index_columns};
use crate::types::SqlValue;

/// A result set from a database query
///
/// Drivers build one with [`ResultSet::with_columns`] and push values row by row;
/// the column names and the lookup index are allocated once and shared.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<DbRow>,
    /// The number of rows collected
    pub rows_affected: usize,
    column_names: Option<Arc<Vec<String>>>,
    column_index: Option<Arc<HashMap<String, usize>>>,
}

impl ResultSet {
    /// Create an empty result set for the given columns.
    #[must_use]
    pub fn with_columns<I, S>(columns: I) -> ResultSet
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = columns.into_iter().map(Into::into).collect();
        let index = index_columns(&names);
        ResultSet {
            results: Vec::new(),
            rows_affected: 0,
            column_names: Some(Arc::new(names)),
            column_index: Some(Arc::new(index)),
        }
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add a row to the result set
    ///
    /// Values beyond the declared columns are ignored; missing trailing values read as NULL.
    pub fn add_row_values(&mut self, mut row_values: Vec<SqlValue>) {
        let (Some(column_names), Some(index)) = (&self.column_names, &self.column_index) else {
            return;
        };
        row_values.resize(column_names.len(), SqlValue::Null);
        self.results.push(DbRow {
            column_names: Arc::clone(column_names),
            values: row_values,
            column_index_cache: Arc::clone(index),
        });
        self.rows_affected += 1;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// First row, if any.
    #[must_use]
    pub fn first(&self) -> Option<&DbRow> {
        self.results.first()
    }

    /// Integer value of `column` in the first row; the shape of every `COUNT(*)` probe.
    #[must_use]
    pub fn scalar_int(&self, column: &str) -> Option<i64> {
        self.first().and_then(|row| row.int(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_lookup() {
        let mut rs = ResultSet::with_columns(["count", "name"]);
        rs.add_row_values(vec![SqlValue::Int(2), SqlValue::Text("pet".into())]);
        rs.add_row_values(vec![SqlValue::Int(5)]);

        assert_eq!(rs.len(), 2);
        assert_eq!(rs.scalar_int("count"), Some(2));
        assert_eq!(rs.results[1].get("name"), Some(&SqlValue::Null));
        assert_eq!(rs.results[0].text("NAME").as_deref(), Some("pet"));
    }
}
