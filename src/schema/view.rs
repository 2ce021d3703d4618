use super::catalog::{DEFAULT_SCHEMA, VIEW_EXISTS};
use crate::adapter::{H2Adapter, Statement};
use crate::error::AdapterError;
use crate::formatter::{Renders, escape_identifier};

/// Catalog and DDL operations on one view.
pub struct ViewHandle<'a> {
    adapter: &'a mut H2Adapter,
    name: String,
}

impl<'a> ViewHandle<'a> {
    pub(crate) fn new(adapter: &'a mut H2Adapter, name: String) -> Self {
        Self { adapter, name }
    }

    /// # Errors
    /// Connection and driver errors.
    pub async fn exists(&mut self) -> Result<bool, AdapterError> {
        view_exists(self.adapter, &self.name).await
    }

    /// Drop the view if it exists.
    ///
    /// # Errors
    /// Connection and driver errors.
    pub async fn drop(&mut self) -> Result<(), AdapterError> {
        drop_view(self.adapter, &self.name).await
    }

    /// Replace the view with one defined by `query`.
    ///
    /// The drop of an existing view and the create run in one transaction, so readers
    /// never observe the view missing.
    ///
    /// # Errors
    /// `FormatError` for an empty or unrenderable query; connection and driver errors.
    pub async fn create(&mut self, query: impl Into<Statement>) -> Result<(), AdapterError> {
        let select = match query.into() {
            Statement::Sql(sql) => sql,
            Statement::Expression(expr) => self.adapter.formatter().render(&expr)?,
        };
        if select.trim().is_empty() {
            return Err(AdapterError::FormatError(format!(
                "view {} needs a defining query",
                self.name
            )));
        }
        let name = self.name.clone();
        let create = format!("CREATE VIEW {} AS {select}", escape_identifier(&name));
        self.adapter
            .execute_in_transaction(move |db| {
                Box::pin(async move {
                    drop_view(db, &name).await?;
                    db.execute_update(&create, &[]).await?;
                    Ok(())
                })
            })
            .await
    }
}

async fn view_exists(adapter: &mut H2Adapter, name: &str) -> Result<bool, AdapterError> {
    let rows = adapter
        .query(VIEW_EXISTS, &[name.into(), DEFAULT_SCHEMA.into()])
        .await?;
    Ok(rows.scalar_int("count").unwrap_or(0) > 0)
}

async fn drop_view(adapter: &mut H2Adapter, name: &str) -> Result<(), AdapterError> {
    if view_exists(adapter, name).await? {
        let sql = format!("DROP VIEW {}", escape_identifier(name));
        adapter.execute_update(&sql, &[]).await?;
    }
    Ok(())
}

impl H2Adapter {
    /// Create or replace view `name`.
    ///
    /// # Errors
    /// See [`ViewHandle::create`].
    pub async fn create_view(
        &mut self,
        name: &str,
        query: impl Into<Statement>,
    ) -> Result<(), AdapterError> {
        self.view(name).create(query).await
    }
}
