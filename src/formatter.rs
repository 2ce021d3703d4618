//! H2 SQL dialect: identifier and literal escaping, column type rendering, DDL text and
//! query-expression rendering.

mod ddl;
mod escape;
mod functions;
mod render;

pub use ddl::{
    add_columns_sql, add_foreign_key_sql, alter_columns_sql, catalog_type, column_definition,
    create_index_sql, create_table_sql, drop_constraint_sql, drop_index_sql, format_field,
    render_type,
};
pub use escape::{escape_identifier, escape_literal};
pub use functions::{FunctionRenderer, FunctionTable};

use crate::error::AdapterError;
use crate::model::FieldDescriptor;
use crate::query::QueryExpression;
use crate::types::SqlValue;

/// Capability of turning a query expression into dialect SQL text.
pub trait Renders {
    /// Render `expr` completely or fail; partial SQL is never returned.
    ///
    /// # Errors
    /// Returns `AdapterError::FormatError` for malformed or unsupported expressions.
    fn render(&self, expr: &QueryExpression) -> Result<String, AdapterError>;
}

/// The H2 dialect formatter.
#[derive(Debug, Clone, Default)]
pub struct H2Formatter {
    functions: FunctionTable,
}

impl H2Formatter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatter using a customised function table.
    #[must_use]
    pub fn with_functions(functions: FunctionTable) -> Self {
        Self { functions }
    }

    #[must_use]
    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut FunctionTable {
        &mut self.functions
    }

    #[must_use]
    pub fn escape_identifier(name: &str) -> String {
        escape_identifier(name)
    }

    /// # Errors
    /// See [`escape_literal`].
    pub fn escape_literal(value: &SqlValue, unquoted: bool) -> Result<String, AdapterError> {
        escape_literal(value, unquoted)
    }

    #[must_use]
    pub fn render_type(field: &FieldDescriptor) -> String {
        render_type(field)
    }
}
