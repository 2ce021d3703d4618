use std::collections::BTreeSet;

use super::IndexSnapshot;
use super::catalog::{DEFAULT_SCHEMA, INDEX_EXISTS, TABLE_INDEXES};
use crate::adapter::H2Adapter;
use crate::error::AdapterError;
use crate::formatter::{create_index_sql, drop_index_sql};

/// Secondary indexes of one table.
pub struct IndexesHandle<'a> {
    adapter: &'a mut H2Adapter,
    table: String,
}

impl<'a> IndexesHandle<'a> {
    pub(crate) fn new(adapter: &'a mut H2Adapter, table: String) -> Self {
        Self { adapter, table }
    }

    /// Indexes of the table, catalog rows grouped by index name.
    ///
    /// # Errors
    /// Connection and driver errors.
    pub async fn list(&mut self) -> Result<Vec<IndexSnapshot>, AdapterError> {
        let rows = self
            .adapter
            .query(TABLE_INDEXES, &[self.table.as_str().into(), DEFAULT_SCHEMA.into()])
            .await?;
        let mut indexes: Vec<IndexSnapshot> = Vec::new();
        for row in &rows.results {
            let (Some(name), Some(column)) = (row.text("indexName"), row.text("columnName")) else {
                continue;
            };
            match indexes.iter_mut().find(|ix| ix.name == name) {
                Some(ix) => ix.columns.push(column),
                None => indexes.push(IndexSnapshot {
                    name,
                    columns: vec![column],
                }),
            }
        }
        Ok(indexes)
    }

    /// Create index `name` over `columns`.
    ///
    /// An index with the same name and column set is left untouched; one with a
    /// different column set is dropped and recreated.
    ///
    /// # Errors
    /// `SchemaError` for an empty name or column list; connection and driver errors.
    pub async fn create(&mut self, name: &str, columns: &[String]) -> Result<(), AdapterError> {
        if name.trim().is_empty() || columns.is_empty() {
            return Err(AdapterError::SchemaError(format!(
                "index on {} needs a name and at least one column",
                self.table
            )));
        }
        let existing = self.list().await?;
        if let Some(ix) = existing.iter().find(|ix| ix.name == name) {
            let wanted: BTreeSet<&str> = columns.iter().map(String::as_str).collect();
            let current: BTreeSet<&str> = ix.columns.iter().map(String::as_str).collect();
            if wanted == current {
                tracing::debug!(index = name, table = %self.table, "index already up to date");
                return Ok(());
            }
            self.drop(name).await?;
        }
        let sql = create_index_sql(name, &self.table, columns);
        self.adapter.execute_update(&sql, &[]).await?;
        Ok(())
    }

    /// Drop index `name` if it exists.
    ///
    /// # Errors
    /// Connection and driver errors.
    pub async fn drop(&mut self, name: &str) -> Result<(), AdapterError> {
        let rows = self
            .adapter
            .query(
                INDEX_EXISTS,
                &[self.table.as_str().into(), DEFAULT_SCHEMA.into(), name.into()],
            )
            .await?;
        if rows.scalar_int("count").unwrap_or(0) > 0 {
            self.adapter.execute_update(&drop_index_sql(name), &[]).await?;
        }
        Ok(())
    }
}
