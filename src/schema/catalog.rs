//! Catalog probes against H2's `INFORMATION_SCHEMA`.

/// The single schema every adapter object lives in.
pub const DEFAULT_SCHEMA: &str = "PUBLIC";

pub(crate) const TABLE_EXISTS: &str = r#"SELECT COUNT(*) AS "count" FROM information_schema.TABLES WHERE TABLE_NAME=? AND TABLE_SCHEMA=?"#;

pub(crate) const VIEW_EXISTS: &str = r#"SELECT COUNT(*) AS "count" FROM information_schema.TABLES WHERE TABLE_NAME=? AND TABLE_TYPE='VIEW' AND TABLE_SCHEMA=?"#;

pub(crate) const TABLE_COLUMNS: &str = r#"SELECT COLUMN_NAME AS "name", TYPE_NAME AS "type", CHARACTER_MAXIMUM_LENGTH AS "size", CASE WHEN IS_NULLABLE='YES' THEN 1 ELSE 0 END AS "nullable", NUMERIC_PRECISION AS "precision", NUMERIC_SCALE AS "scale", (SELECT COUNT(*) FROM information_schema.INDEXES WHERE TABLE_CATALOG="c".TABLE_CATALOG AND TABLE_SCHEMA="c".TABLE_SCHEMA AND TABLE_NAME="c".TABLE_NAME AND PRIMARY_KEY=true AND COLUMN_NAME="c".COLUMN_NAME) AS "primary" FROM information_schema.COLUMNS AS "c" WHERE TABLE_NAME=? AND TABLE_SCHEMA=? ORDER BY ORDINAL_POSITION"#;

pub(crate) const TABLE_VERSION: &str =
    r#"SELECT MAX("version") AS "version" FROM "migrations" WHERE "appliesTo"=?"#;

pub(crate) const TABLE_INDEXES: &str = r#"SELECT INDEX_NAME AS "indexName", TABLE_NAME AS "tableName", COLUMN_NAME AS "columnName" FROM "INFORMATION_SCHEMA".INDEXES WHERE TABLE_NAME=? AND TABLE_SCHEMA=? AND INDEX_TYPE_NAME='INDEX' ORDER BY ORDINAL_POSITION"#;

pub(crate) const INDEX_EXISTS: &str = r#"SELECT COUNT(*) AS "count" FROM "INFORMATION_SCHEMA".INDEXES WHERE TABLE_NAME=? AND TABLE_SCHEMA=? AND INDEX_NAME=?"#;

pub(crate) const TABLE_FOREIGN_KEYS: &str = r#"SELECT FK_NAME AS "foreignKeyName", PKTABLE_NAME AS "primaryKeyTable", PKCOLUMN_NAME AS "primaryKeyColumn", FKTABLE_NAME AS "foreignKeyTable", FKCOLUMN_NAME AS "foreignKeyColumn" FROM "INFORMATION_SCHEMA".CROSS_REFERENCES WHERE FKTABLE_NAME=? AND FKTABLE_SCHEMA=?"#;

pub(crate) const FOREIGN_KEY_NAME: &str = r#"SELECT FK_NAME AS "foreignKeyName" FROM "INFORMATION_SCHEMA".CROSS_REFERENCES WHERE FKTABLE_NAME=? AND FKTABLE_SCHEMA=? AND FKCOLUMN_NAME=? AND PKTABLE_NAME=? AND PKCOLUMN_NAME=?"#;

pub(crate) const MIGRATION_APPLIED: &str =
    r#"SELECT COUNT(*) AS "count" FROM "migrations" WHERE "appliesTo"=? AND "version"=?"#;

pub(crate) const RECORD_MIGRATION: &str = r#"INSERT INTO "migrations" ("appliesTo","model","version","description") VALUES (?,?,?,?)"#;

pub(crate) const LIST_MIGRATIONS: &str = r#"SELECT "id", "appliesTo", "model", "description", "version" FROM "migrations" WHERE "appliesTo"=? ORDER BY "id""#;
