use super::catalog::{DEFAULT_SCHEMA, TABLE_COLUMNS, TABLE_EXISTS, TABLE_VERSION};
use super::ColumnSnapshot;
use crate::adapter::H2Adapter;
use crate::error::AdapterError;
use crate::formatter::{add_columns_sql, alter_columns_sql, create_table_sql};
use crate::model::FieldDescriptor;

const NO_VERSION: &str = "0.0";

/// Catalog and DDL operations on one table.
pub struct TableHandle<'a> {
    adapter: &'a mut H2Adapter,
    name: String,
}

impl<'a> TableHandle<'a> {
    pub(crate) fn new(adapter: &'a mut H2Adapter, name: String) -> Self {
        Self { adapter, name }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// # Errors
    /// Connection and driver errors.
    pub async fn exists(&mut self) -> Result<bool, AdapterError> {
        let rows = self
            .adapter
            .query(TABLE_EXISTS, &[self.name.as_str().into(), DEFAULT_SCHEMA.into()])
            .await?;
        Ok(rows.scalar_int("count").unwrap_or(0) > 0)
    }

    /// Highest migration version recorded for this table, `0.0` when none.
    ///
    /// # Errors
    /// Connection and driver errors (including a missing `migrations` table).
    pub async fn version(&mut self) -> Result<String, AdapterError> {
        let rows = self
            .adapter
            .query(TABLE_VERSION, &[self.name.as_str().into()])
            .await?;
        Ok(rows
            .first()
            .and_then(|row| row.text("version"))
            .unwrap_or_else(|| NO_VERSION.to_string()))
    }

    /// # Errors
    /// Connection and driver errors.
    pub async fn columns(&mut self) -> Result<Vec<ColumnSnapshot>, AdapterError> {
        let rows = self
            .adapter
            .query(TABLE_COLUMNS, &[self.name.as_str().into(), DEFAULT_SCHEMA.into()])
            .await?;
        Ok(rows.results.iter().map(ColumnSnapshot::from_row).collect())
    }

    /// Create the table from `fields`.
    ///
    /// # Errors
    /// `SchemaError` when there is no physical column to create; driver errors otherwise.
    pub async fn create(&mut self, fields: &[FieldDescriptor]) -> Result<(), AdapterError> {
        if fields.iter().all(|f| f.one_to_many) {
            return Err(AdapterError::SchemaError(format!(
                "cannot create table {} without columns",
                self.name
            )));
        }
        let sql = create_table_sql(&self.name, fields);
        self.adapter.execute_update(&sql, &[]).await?;
        Ok(())
    }

    /// Add `fields` as new columns; an empty list is a no-op.
    ///
    /// # Errors
    /// Connection and driver errors.
    pub async fn add(&mut self, fields: &[FieldDescriptor]) -> Result<(), AdapterError> {
        self.run_batch(add_columns_sql(&self.name, fields)).await
    }

    /// Alter existing columns to the types of `fields`; an empty list is a no-op.
    ///
    /// # Errors
    /// Connection and driver errors.
    pub async fn change(&mut self, fields: &[FieldDescriptor]) -> Result<(), AdapterError> {
        self.run_batch(alter_columns_sql(&self.name, fields)).await
    }

    async fn run_batch(&mut self, sql: Option<String>) -> Result<(), AdapterError> {
        if let Some(sql) = sql {
            self.adapter.execute_update(&sql, &[]).await?;
        }
        Ok(())
    }
}
