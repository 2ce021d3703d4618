use crate::model::FieldDescriptor;
use crate::types::FieldType;

use super::escape::escape_identifier;

const DEFAULT_DECIMAL_PRECISION: u32 = 19;
const DEFAULT_DECIMAL_SCALE: u32 = 8;
const DEFAULT_DURATION_SIZE: u32 = 36;
const DEFAULT_TEXT_SIZE: u32 = 512;

/// Dialect column type for `field`, including its nullability.
///
/// Total over every tag: unknown tags render as `INTEGER`. Counters are always
/// `NOT NULL`; everything else is `NULL` unless the descriptor says otherwise.
#[must_use]
pub fn render_type(field: &FieldDescriptor) -> String {
    let size = field.size.filter(|s| *s > 0);
    let scale = field.scale.filter(|s| *s > 0);
    let base = match &field.field_type {
        FieldType::Boolean => "BOOLEAN".to_string(),
        FieldType::Byte => "TINYINT".to_string(),
        FieldType::Number | FieldType::Float => "REAL".to_string(),
        FieldType::Counter => return "INT AUTO_INCREMENT NOT NULL".to_string(),
        FieldType::Currency => "DECIMAL(19,4)".to_string(),
        FieldType::Decimal => format!(
            "DECIMAL({},{})",
            size.unwrap_or(DEFAULT_DECIMAL_PRECISION),
            scale.unwrap_or(DEFAULT_DECIMAL_SCALE)
        ),
        FieldType::Date => "DATE".to_string(),
        FieldType::DateTime => "TIMESTAMP".to_string(),
        FieldType::Time => "TIME".to_string(),
        FieldType::Integer => "INTEGER".to_string(),
        FieldType::Duration => format!("VARCHAR({})", size.unwrap_or(DEFAULT_DURATION_SIZE)),
        FieldType::BigInteger => "BIGINT".to_string(),
        FieldType::Url | FieldType::Text => {
            format!("VARCHAR({})", size.unwrap_or(DEFAULT_TEXT_SIZE))
        }
        FieldType::Note => size.map_or_else(|| "CLOB".to_string(), |s| format!("VARCHAR({s})")),
        FieldType::Image | FieldType::Binary => {
            size.map_or_else(|| "BLOB".to_string(), |s| format!("BLOB({s})"))
        }
        FieldType::Guid => "VARCHAR(36)".to_string(),
        FieldType::Short => "SMALLINT".to_string(),
        FieldType::Other(_) => "INTEGER".to_string(),
    };
    if field.nullable.unwrap_or(true) {
        format!("{base} NULL")
    } else {
        format!("{base} NOT NULL")
    }
}

/// Type text the catalog reports back for a column created from `field`.
///
/// Same as [`render_type`] except for counters: the catalog lists them as plain
/// `INTEGER NOT NULL` without the auto-increment clause.
#[must_use]
pub fn catalog_type(field: &FieldDescriptor) -> String {
    match field.field_type {
        FieldType::Counter => "INTEGER NOT NULL".to_string(),
        _ => render_type(field),
    }
}

/// Expand `%f` (field name) and `%t` (rendered type) in `pattern`.
#[must_use]
pub fn format_field(pattern: &str, field: &FieldDescriptor) -> String {
    let mut out = pattern.to_string();
    if out.contains("%t") {
        out = out.replace("%t", &render_type(field));
    }
    if out.contains("%f") {
        out = out.replace("%f", &field.name);
    }
    out
}

/// `"name" TYPE` column definition.
#[must_use]
pub fn column_definition(field: &FieldDescriptor) -> String {
    format!("{} {}", escape_identifier(&field.name), render_type(field))
}

/// CREATE TABLE statement; one-to-many fields are skipped and primary-key fields are
/// collected into one composite `PRIMARY KEY (...)` clause.
#[must_use]
pub fn create_table_sql(table: &str, fields: &[FieldDescriptor]) -> String {
    let mut parts: Vec<String> = fields
        .iter()
        .filter(|f| !f.one_to_many)
        .map(column_definition)
        .collect();
    let primary: Vec<String> = fields
        .iter()
        .filter(|f| f.primary && !f.one_to_many)
        .map(|f| escape_identifier(&f.name))
        .collect();
    if !primary.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", primary.join(", ")));
    }
    format!("CREATE TABLE {} ({})", escape_identifier(table), parts.join(", "))
}

/// `;`-joined ALTER TABLE ... ADD statements, or `None` when there is nothing to add.
#[must_use]
pub fn add_columns_sql(table: &str, fields: &[FieldDescriptor]) -> Option<String> {
    alter_batch(table, fields, "ADD")
}

/// `;`-joined ALTER TABLE ... ALTER COLUMN statements, or `None` when nothing changes.
#[must_use]
pub fn alter_columns_sql(table: &str, fields: &[FieldDescriptor]) -> Option<String> {
    alter_batch(table, fields, "ALTER COLUMN")
}

fn alter_batch(table: &str, fields: &[FieldDescriptor], action: &str) -> Option<String> {
    let table = escape_identifier(table);
    let statements: Vec<String> = fields
        .iter()
        .filter(|f| !f.one_to_many)
        .map(|f| format!("ALTER TABLE {table} {action} {}", column_definition(f)))
        .collect();
    if statements.is_empty() {
        None
    } else {
        Some(statements.join(";"))
    }
}

#[must_use]
pub fn create_index_sql(name: &str, table: &str, columns: &[String]) -> String {
    let columns: Vec<String> = columns.iter().map(|c| escape_identifier(c)).collect();
    format!(
        "CREATE INDEX {} ON {}({})",
        escape_identifier(name),
        escape_identifier(table),
        columns.join(",")
    )
}

#[must_use]
pub fn drop_index_sql(name: &str) -> String {
    format!("DROP INDEX {}", escape_identifier(name))
}

#[must_use]
pub fn add_foreign_key_sql(
    table: &str,
    foreign_key_column: &str,
    primary_key_table: &str,
    primary_key_column: &str,
) -> String {
    format!(
        "ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {}({})",
        escape_identifier(table),
        escape_identifier(foreign_key_column),
        escape_identifier(primary_key_table),
        escape_identifier(primary_key_column)
    )
}

#[must_use]
pub fn drop_constraint_sql(table: &str, constraint: &str) -> String {
    format!(
        "ALTER TABLE {} DROP CONSTRAINT {}",
        escape_identifier(table),
        escape_identifier(constraint)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(tag: &str) -> FieldDescriptor {
        FieldDescriptor::new("f", tag)
    }

    #[test]
    fn type_table() {
        let cases = [
            ("Boolean", "BOOLEAN NULL"),
            ("Byte", "TINYINT NULL"),
            ("Number", "REAL NULL"),
            ("Float", "REAL NULL"),
            ("Currency", "DECIMAL(19,4) NULL"),
            ("Decimal", "DECIMAL(19,8) NULL"),
            ("Date", "DATE NULL"),
            ("DateTime", "TIMESTAMP NULL"),
            ("Time", "TIME NULL"),
            ("Integer", "INTEGER NULL"),
            ("Duration", "VARCHAR(36) NULL"),
            ("BigInteger", "BIGINT NULL"),
            ("URL", "VARCHAR(512) NULL"),
            ("Text", "VARCHAR(512) NULL"),
            ("Note", "CLOB NULL"),
            ("Image", "BLOB NULL"),
            ("Binary", "BLOB NULL"),
            ("Guid", "VARCHAR(36) NULL"),
            ("Short", "SMALLINT NULL"),
            ("SomethingElse", "INTEGER NULL"),
        ];
        for (tag, expected) in cases {
            assert_eq!(render_type(&field(tag)), expected, "tag {tag}");
        }
    }

    #[test]
    fn sized_types() {
        assert_eq!(render_type(&field("Text").size(50)), "VARCHAR(50) NULL");
        assert_eq!(render_type(&field("Note").size(2000)), "VARCHAR(2000) NULL");
        assert_eq!(render_type(&field("Binary").size(64)), "BLOB(64) NULL");
        assert_eq!(
            render_type(&field("Decimal").size(12).scale(2)),
            "DECIMAL(12,2) NULL"
        );
        assert_eq!(render_type(&field("Duration").size(0)), "VARCHAR(36) NULL");
    }

    #[test]
    fn nullability() {
        assert_eq!(render_type(&field("Integer").nullable(false)), "INTEGER NOT NULL");
        assert_eq!(render_type(&field("Integer").nullable(true)), "INTEGER NULL");
        assert_eq!(
            render_type(&field("Counter").nullable(true)),
            "INT AUTO_INCREMENT NOT NULL"
        );
        assert_eq!(render_type(&field("Counter")), "INT AUTO_INCREMENT NOT NULL");
    }

    #[test]
    fn field_patterns() {
        let f = FieldDescriptor::new("name", "Text").size(50);
        assert_eq!(format_field("\"%f\" %t", &f), "\"name\" VARCHAR(50) NULL");
    }

    #[test]
    fn create_table_with_composite_key() {
        let fields = vec![
            FieldDescriptor::new("a", "Integer").primary(),
            FieldDescriptor::new("b", "Integer").primary(),
            FieldDescriptor::new("children", "Child").one_to_many(),
            FieldDescriptor::new("label", "Text").size(20),
        ];
        assert_eq!(
            create_table_sql("pair", &fields),
            "CREATE TABLE \"pair\" (\"a\" INTEGER NULL, \"b\" INTEGER NULL, \"label\" VARCHAR(20) NULL, PRIMARY KEY (\"a\", \"b\"))"
        );
    }

    #[test]
    fn alter_batches() {
        let fields = vec![
            FieldDescriptor::new("x", "Integer"),
            FieldDescriptor::new("y", "Boolean").nullable(false),
        ];
        assert_eq!(
            add_columns_sql("t", &fields).unwrap(),
            "ALTER TABLE \"t\" ADD \"x\" INTEGER NULL;ALTER TABLE \"t\" ADD \"y\" BOOLEAN NOT NULL"
        );
        assert_eq!(
            alter_columns_sql("t", &fields[..1]).unwrap(),
            "ALTER TABLE \"t\" ALTER COLUMN \"x\" INTEGER NULL"
        );
        assert!(add_columns_sql("t", &[]).is_none());
    }

    #[test]
    fn index_and_key_statements() {
        assert_eq!(
            create_index_sql("ix", "pet", &["a".into(), "b".into()]),
            "CREATE INDEX \"ix\" ON \"pet\"(\"a\",\"b\")"
        );
        assert_eq!(drop_index_sql("ix"), "DROP INDEX \"ix\"");
        assert_eq!(
            add_foreign_key_sql("pet", "owner", "person", "id"),
            "ALTER TABLE \"pet\" ADD FOREIGN KEY (\"owner\") REFERENCES \"person\"(\"id\")"
        );
        assert_eq!(
            drop_constraint_sql("pet", "FK_1"),
            "ALTER TABLE \"pet\" DROP CONSTRAINT \"FK_1\""
        );
    }
}
