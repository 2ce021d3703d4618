//! Live catalog introspection and the DDL operations built on it.
//!
//! Every call queries the catalog afresh; nothing is cached between calls. Handles
//! borrow the adapter mutably and open it on demand:
//! ```rust,no_run
//! # use h2_middleware::prelude::*;
//! # async fn demo(db: &mut H2Adapter) -> Result<(), AdapterError> {
//! if db.table("pet").exists().await? {
//!     for column in db.table("pet").columns().await? {
//!         println!("{} {}", column.name, column.rendered_type);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod catalog;
mod foreign_keys;
mod indexes;
mod table;
mod view;

pub use catalog::DEFAULT_SCHEMA;
pub(crate) use catalog::{LIST_MIGRATIONS, MIGRATION_APPLIED, RECORD_MIGRATION};
pub use foreign_keys::ForeignKeysHandle;
pub use indexes::IndexesHandle;
pub use table::TableHandle;
pub use view::ViewHandle;

#[cfg(feature = "test-utils")]
pub(crate) use catalog::{
    FOREIGN_KEY_NAME, INDEX_EXISTS, TABLE_COLUMNS, TABLE_EXISTS, TABLE_FOREIGN_KEYS,
    TABLE_INDEXES, VIEW_EXISTS,
};

use crate::adapter::H2Adapter;
use crate::results::DbRow;

/// One live column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSnapshot {
    pub name: String,
    pub type_name: String,
    pub size: Option<i64>,
    pub nullable: bool,
    pub precision: Option<i64>,
    pub scale: Option<i64>,
    pub primary: bool,
    /// Type text comparable with [`catalog_type`](crate::formatter::catalog_type) output.
    pub rendered_type: String,
}

impl ColumnSnapshot {
    pub(crate) fn from_row(row: &DbRow) -> Self {
        let name = row.text("name").unwrap_or_default();
        let type_name = row.text("type").unwrap_or_default();
        let size = row.int("size");
        let nullable = row.flag("nullable");
        let precision = row.int("precision");
        let scale = row.int("scale");
        let rendered_type = rendered_type(&type_name, size, precision, scale, nullable);
        Self {
            name,
            type_name,
            size,
            nullable,
            precision,
            scale,
            primary: row.flag("primary"),
            rendered_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSnapshot {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeySnapshot {
    pub foreign_key_name: String,
    pub primary_key_table: String,
    pub primary_key_column: String,
    pub foreign_key_table: String,
    pub foreign_key_column: String,
}

impl ForeignKeySnapshot {
    pub(crate) fn from_row(row: &DbRow) -> Self {
        Self {
            foreign_key_name: row.text("foreignKeyName").unwrap_or_default(),
            primary_key_table: row.text("primaryKeyTable").unwrap_or_default(),
            primary_key_column: row.text("primaryKeyColumn").unwrap_or_default(),
            foreign_key_table: row.text("foreignKeyTable").unwrap_or_default(),
            foreign_key_column: row.text("foreignKeyColumn").unwrap_or_default(),
        }
    }
}

/// Rebuild the dialect type text of a live column from its catalog attributes.
///
/// Character and BLOB types carry their length and exact numerics their precision and
/// scale, mirroring [`catalog_type`](crate::formatter::catalog_type) for the same declaration.
#[must_use]
pub fn rendered_type(
    type_name: &str,
    size: Option<i64>,
    precision: Option<i64>,
    scale: Option<i64>,
    nullable: bool,
) -> String {
    let upper = type_name.trim().to_ascii_uppercase();
    let base = match upper.as_str() {
        "CHARACTER VARYING" | "VARCHAR" => sized("VARCHAR", size),
        "CHARACTER" | "CHAR" => sized("CHAR", size),
        "VARCHAR_IGNORECASE" => sized("VARCHAR_IGNORECASE", size),
        "BLOB" | "BINARY LARGE OBJECT" => sized("BLOB", size),
        "DECIMAL" | "NUMERIC" => match (precision, scale) {
            (Some(p), Some(s)) => format!("DECIMAL({p},{s})"),
            (Some(p), None) => format!("DECIMAL({p})"),
            _ => "DECIMAL".to_string(),
        },
        "INT" => "INTEGER".to_string(),
        _ => upper.clone(),
    };
    if nullable {
        format!("{base} NULL")
    } else {
        format!("{base} NOT NULL")
    }
}

fn sized(base: &str, size: Option<i64>) -> String {
    match size {
        Some(size) if size > 0 => format!("{base}({size})"),
        _ => base.to_string(),
    }
}

impl H2Adapter {
    #[must_use]
    pub fn table(&mut self, name: impl Into<String>) -> TableHandle<'_> {
        TableHandle::new(self, name.into())
    }

    #[must_use]
    pub fn view(&mut self, name: impl Into<String>) -> ViewHandle<'_> {
        ViewHandle::new(self, name.into())
    }

    #[must_use]
    pub fn indexes(&mut self, table: impl Into<String>) -> IndexesHandle<'_> {
        IndexesHandle::new(self, table.into())
    }

    #[must_use]
    pub fn foreign_keys(&mut self, table: impl Into<String>) -> ForeignKeysHandle<'_> {
        ForeignKeysHandle::new(self, table.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::{catalog_type, render_type};
    use crate::model::FieldDescriptor;
    use crate::types::FieldType;

    #[test]
    fn rendered_types_match_formatter_output() {
        let cases = [
            (
                FieldDescriptor::new("name", FieldType::Text).size(50),
                rendered_type("VARCHAR", Some(50), None, None, true),
            ),
            (
                FieldDescriptor::new("price", FieldType::Currency).nullable(false),
                rendered_type("DECIMAL", None, Some(19), Some(4), false),
            ),
            (
                FieldDescriptor::new("born", FieldType::DateTime),
                rendered_type("TIMESTAMP", None, Some(26), Some(6), true),
            ),
            (
                FieldDescriptor::new("age", FieldType::Integer),
                rendered_type("INT", None, Some(32), Some(0), true),
            ),
            (
                FieldDescriptor::new("photo", FieldType::Binary).size(64),
                rendered_type("BLOB", Some(64), None, None, true),
            ),
            (
                FieldDescriptor::new("rate", FieldType::Decimal).size(12).scale(2),
                rendered_type("NUMERIC", None, Some(12), Some(2), true),
            ),
            (
                FieldDescriptor::new("scan", FieldType::Image),
                rendered_type("BINARY LARGE OBJECT", None, None, None, true),
            ),
            (
                FieldDescriptor::new("serial", FieldType::Counter),
                rendered_type("INTEGER", None, Some(32), Some(0), false),
            ),
        ];
        for (field, live) in cases {
            assert_eq!(catalog_type(&field), live, "field {}", field.name);
        }
    }

    #[test]
    fn counters_compare_without_auto_increment() {
        let field = FieldDescriptor::new("serial", FieldType::Counter);
        assert_eq!(render_type(&field), "INT AUTO_INCREMENT NOT NULL");
        assert_eq!(catalog_type(&field), "INTEGER NOT NULL");
    }

    #[test]
    fn size_change_is_visible() {
        let live = rendered_type("CHARACTER VARYING", Some(50), None, None, true);
        let wanted = catalog_type(&FieldDescriptor::new("name", FieldType::Text).size(100));
        assert_eq!(live, "VARCHAR(50) NULL");
        assert_ne!(live, wanted);
    }
}
