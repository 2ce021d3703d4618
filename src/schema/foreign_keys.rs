use super::ForeignKeySnapshot;
use super::catalog::{DEFAULT_SCHEMA, FOREIGN_KEY_NAME, TABLE_FOREIGN_KEYS};
use crate::adapter::H2Adapter;
use crate::error::AdapterError;
use crate::formatter::{add_foreign_key_sql, drop_constraint_sql};
use crate::types::SqlValue;

/// Foreign keys declared on one (referencing) table.
pub struct ForeignKeysHandle<'a> {
    adapter: &'a mut H2Adapter,
    table: String,
}

impl<'a> ForeignKeysHandle<'a> {
    pub(crate) fn new(adapter: &'a mut H2Adapter, table: String) -> Self {
        Self { adapter, table }
    }

    /// # Errors
    /// Connection and driver errors.
    pub async fn list(&mut self) -> Result<Vec<ForeignKeySnapshot>, AdapterError> {
        let rows = self
            .adapter
            .query(TABLE_FOREIGN_KEYS, &[self.table.as_str().into(), DEFAULT_SCHEMA.into()])
            .await?;
        Ok(rows.results.iter().map(ForeignKeySnapshot::from_row).collect())
    }

    /// Reference `primary_key_table.primary_key_column` from `foreign_key_column`, unless
    /// that exact reference already exists.
    ///
    /// # Errors
    /// Connection and driver errors.
    pub async fn create(
        &mut self,
        foreign_key_column: &str,
        primary_key_table: &str,
        primary_key_column: &str,
    ) -> Result<(), AdapterError> {
        if self
            .constraint_name(foreign_key_column, primary_key_table, primary_key_column)
            .await?
            .is_some()
        {
            return Ok(());
        }
        let sql = add_foreign_key_sql(
            &self.table,
            foreign_key_column,
            primary_key_table,
            primary_key_column,
        );
        self.adapter.execute_update(&sql, &[]).await?;
        Ok(())
    }

    /// Drop the reference, if present.
    ///
    /// # Errors
    /// Connection and driver errors.
    pub async fn drop(
        &mut self,
        foreign_key_column: &str,
        primary_key_table: &str,
        primary_key_column: &str,
    ) -> Result<(), AdapterError> {
        let Some(constraint) = self
            .constraint_name(foreign_key_column, primary_key_table, primary_key_column)
            .await?
        else {
            return Ok(());
        };
        let sql = drop_constraint_sql(&self.table, &constraint);
        self.adapter.execute_update(&sql, &[]).await?;
        Ok(())
    }

    async fn constraint_name(
        &mut self,
        foreign_key_column: &str,
        primary_key_table: &str,
        primary_key_column: &str,
    ) -> Result<Option<String>, AdapterError> {
        let params: [SqlValue; 5] = [
            self.table.as_str().into(),
            DEFAULT_SCHEMA.into(),
            foreign_key_column.into(),
            primary_key_table.into(),
            primary_key_column.into(),
        ];
        let rows = self.adapter.query(FOREIGN_KEY_NAME, &params).await?;
        Ok(rows.first().and_then(|row| row.text("foreignKeyName")))
    }
}
