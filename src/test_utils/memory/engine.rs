//! A small interpreter for the SQL the adapter emits, over an in-memory catalog.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::DriverError;
use crate::results::ResultSet;
use crate::schema::{
    DEFAULT_SCHEMA, FOREIGN_KEY_NAME, INDEX_EXISTS, TABLE_COLUMNS, TABLE_EXISTS,
    TABLE_FOREIGN_KEYS, TABLE_INDEXES, VIEW_EXISTS,
};
use crate::types::SqlValue;

// H2 error codes
const TABLE_NOT_FOUND: i32 = 42102;
const TABLE_EXISTS_CODE: i32 = 42101;
const COLUMN_NOT_FOUND: i32 = 42122;
const DUPLICATE_COLUMN: i32 = 42121;
const INDEX_EXISTS_CODE: i32 = 42111;
const INDEX_NOT_FOUND: i32 = 42112;
const CONSTRAINT_NOT_FOUND: i32 = 90057;
const NULL_NOT_ALLOWED: i32 = 23502;
const SYNTAX_ERROR: i32 = 42000;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("memory catalog pattern")
}

static CREATE_TABLE: LazyLock<Regex> =
    LazyLock::new(|| re(r#"(?is)^CREATE TABLE\s+"([^"]+)"\s*\((.*)\)$"#));
static DROP_TABLE: LazyLock<Regex> = LazyLock::new(|| re(r#"(?is)^DROP TABLE\s+"([^"]+)"$"#));
static ADD_FOREIGN_KEY: LazyLock<Regex> = LazyLock::new(|| {
    re(r#"(?is)^ALTER TABLE\s+"([^"]+)"\s+ADD FOREIGN KEY\s*\("([^"]+)"\)\s+REFERENCES\s+"([^"]+)"\s*\("([^"]+)"\)$"#)
});
static DROP_CONSTRAINT: LazyLock<Regex> =
    LazyLock::new(|| re(r#"(?is)^ALTER TABLE\s+"([^"]+)"\s+DROP CONSTRAINT\s+"([^"]+)"$"#));
static ADD_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| re(r#"(?is)^ALTER TABLE\s+"([^"]+)"\s+ADD\s+"([^"]+)"\s+(.+)$"#));
static ALTER_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| re(r#"(?is)^ALTER TABLE\s+"([^"]+)"\s+ALTER COLUMN\s+"([^"]+)"\s+(.+)$"#));
static CREATE_INDEX: LazyLock<Regex> =
    LazyLock::new(|| re(r#"(?is)^CREATE INDEX\s+"([^"]+)"\s+ON\s+"([^"]+)"\s*\((.+)\)$"#));
static DROP_INDEX: LazyLock<Regex> = LazyLock::new(|| re(r#"(?is)^DROP INDEX\s+"([^"]+)"$"#));
static CREATE_VIEW: LazyLock<Regex> =
    LazyLock::new(|| re(r#"(?is)^CREATE VIEW\s+"([^"]+)"\s+AS\s+(.+)$"#));
static DROP_VIEW: LazyLock<Regex> = LazyLock::new(|| re(r#"(?is)^DROP VIEW\s+"([^"]+)"$"#));
static INSERT: LazyLock<Regex> = LazyLock::new(|| {
    re(r#"(?is)^INSERT INTO\s+"([^"]+)"\s*\((.+?)\)\s*VALUES\s*\((.*)\)$"#)
});
static UPDATE: LazyLock<Regex> =
    LazyLock::new(|| re(r#"(?is)^UPDATE\s+"([^"]+)"\s+SET\s+(.+?)(?:\s+WHERE\s+(.+))?$"#));
static DELETE: LazyLock<Regex> =
    LazyLock::new(|| re(r#"(?is)^DELETE FROM\s+"([^"]+)"(?:\s+WHERE\s+(.+))?$"#));
static SELECT: LazyLock<Regex> = LazyLock::new(|| {
    re(r#"(?is)^SELECT\s+(.+?)\s+FROM\s+"([^"]+)"(?:\s+WHERE\s+(.+?))?(?:\s+ORDER BY\s+(.+))?$"#)
});
static COLUMN_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    re(r#"(?i)^([A-Z_]+)(?:\((\d+)(?:,\s*(\d+))?\))?(\s+AUTO_INCREMENT)?(?:\s+(NOT NULL|NULL))?$"#)
});
static COLUMN_DEF: LazyLock<Regex> = LazyLock::new(|| re(r#"(?s)^"([^"]+)"\s+(.+)$"#));
static QUOTED: LazyLock<Regex> = LazyLock::new(|| re(r#""([^"]+)""#));
static EQUALS: LazyLock<Regex> = LazyLock::new(|| re(r#"(?s)^"([^"]+)"\s*=\s*(.+)$"#));
static IS_NULL: LazyLock<Regex> = LazyLock::new(|| re(r#"(?i)^"([^"]+)"\s+IS NULL$"#));
static AND: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)\s+AND\s+"));
static AGGREGATE: LazyLock<Regex> = LazyLock::new(|| {
    re(r#"(?i)^(COUNT|MAX)\((\*|"([^"]+)")\)(?:\s+AS\s+"([^"]+)")?$"#)
});
static PROJECTED: LazyLock<Regex> =
    LazyLock::new(|| re(r#"(?i)^"([^"]+)"(?:\s+AS\s+"([^"]+)")?$"#));

pub type Row = BTreeMap<String, SqlValue>;

#[derive(Debug, Clone)]
pub(crate) struct Column {
    pub(crate) name: String,
    pub(crate) type_name: String,
    pub(crate) size: Option<i64>,
    pub(crate) precision: Option<i64>,
    pub(crate) scale: Option<i64>,
    pub(crate) nullable: bool,
    pub(crate) auto_increment: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    pub(crate) columns: Vec<Column>,
    pub(crate) primary_key: Vec<String>,
    pub(crate) rows: Vec<Row>,
    next_id: i64,
}

impl Table {
    fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Index {
    pub(crate) name: String,
    pub(crate) table: String,
    pub(crate) columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ForeignKey {
    pub(crate) name: String,
    pub(crate) table: String,
    pub(crate) column: String,
    pub(crate) primary_key_table: String,
    pub(crate) primary_key_column: String,
}

pub(crate) enum Outcome {
    Rows(ResultSet),
    Affected(usize),
}

/// Everything stored in one in-memory database.
#[derive(Debug, Clone, Default)]
pub(crate) struct Catalog {
    pub(crate) tables: BTreeMap<String, Table>,
    pub(crate) views: BTreeMap<String, String>,
    pub(crate) indexes: Vec<Index>,
    pub(crate) foreign_keys: Vec<ForeignKey>,
    constraint_seq: u32,
}

struct Params<'a> {
    values: &'a [SqlValue],
    next: usize,
}

impl Params<'_> {
    fn take(&mut self) -> Result<SqlValue, DriverError> {
        let value = self
            .values
            .get(self.next)
            .cloned()
            .ok_or_else(|| DriverError::new("Parameter not set").with_code(90012))?;
        self.next += 1;
        Ok(value)
    }

    fn resolve(&mut self, token: &str) -> Result<SqlValue, DriverError> {
        if token.trim() == "?" {
            self.take()
        } else {
            parse_literal(token)
        }
    }
}

fn not_found(table: &str) -> DriverError {
    DriverError::new(format!("Table \"{table}\" not found")).with_code(TABLE_NOT_FOUND)
}

fn syntax(sql: &str) -> DriverError {
    DriverError::new(format!("Syntax error in SQL statement \"{sql}\"")).with_code(SYNTAX_ERROR)
}

fn count_rows(count: usize) -> ResultSet {
    let mut rs = ResultSet::with_columns(["count"]);
    rs.add_row_values(vec![SqlValue::Int(i64::try_from(count).unwrap_or(i64::MAX))]);
    rs
}

fn text(value: &SqlValue) -> String {
    match value {
        SqlValue::Text(s) | SqlValue::Identifier(s) => s.clone(),
        SqlValue::Int(n) => n.to_string(),
        other => format!("{other:?}"),
    }
}

impl Catalog {
    pub(crate) fn run(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        last_identity: &mut Option<i64>,
    ) -> Result<Outcome, DriverError> {
        let sql = sql.trim().trim_end_matches(';').trim();
        let mut params = Params {
            values: params,
            next: 0,
        };
        if let Some(rows) = self.catalog_query(sql, &mut params)? {
            return Ok(Outcome::Rows(rows));
        }
        match sql.to_ascii_uppercase().as_str() {
            "SELECT 1" => {
                let mut rs = ResultSet::with_columns(["1"]);
                rs.add_row_values(vec![SqlValue::Int(1)]);
                return Ok(Outcome::Rows(rs));
            }
            r#"SELECT SCOPE_IDENTITY() AS "LASTVAL""# => {
                let mut rs = ResultSet::with_columns(["lastval"]);
                rs.add_row_values(vec![last_identity.map_or(SqlValue::Null, SqlValue::Int)]);
                return Ok(Outcome::Rows(rs));
            }
            r#"SELECT FORMATDATETIME(CURRENT_TIMESTAMP(),'XXX') AS "TIMEZONE""# => {
                let mut rs = ResultSet::with_columns(["timezone"]);
                rs.add_row_values(vec![SqlValue::Text("+00:00".into())]);
                return Ok(Outcome::Rows(rs));
            }
            _ => {}
        }
        if let Some(c) = CREATE_TABLE.captures(sql) {
            return self.create_table(&c[1], &c[2]).map(|()| Outcome::Affected(0));
        }
        if let Some(c) = DROP_TABLE.captures(sql) {
            return self.drop_table(&c[1]).map(|()| Outcome::Affected(0));
        }
        if let Some(c) = ADD_FOREIGN_KEY.captures(sql) {
            return self
                .add_foreign_key(&c[1], &c[2], &c[3], &c[4])
                .map(|()| Outcome::Affected(0));
        }
        if let Some(c) = DROP_CONSTRAINT.captures(sql) {
            return self.drop_constraint(&c[1], &c[2]).map(|()| Outcome::Affected(0));
        }
        if let Some(c) = ADD_COLUMN.captures(sql) {
            return self.add_column(&c[1], &c[2], &c[3]).map(|()| Outcome::Affected(0));
        }
        if let Some(c) = ALTER_COLUMN.captures(sql) {
            return self.alter_column(&c[1], &c[2], &c[3]).map(|()| Outcome::Affected(0));
        }
        if let Some(c) = CREATE_INDEX.captures(sql) {
            return self.create_index(&c[1], &c[2], &c[3]).map(|()| Outcome::Affected(0));
        }
        if let Some(c) = DROP_INDEX.captures(sql) {
            return self.drop_index(&c[1]).map(|()| Outcome::Affected(0));
        }
        if let Some(c) = CREATE_VIEW.captures(sql) {
            return self.create_view(&c[1], &c[2]).map(|()| Outcome::Affected(0));
        }
        if let Some(c) = DROP_VIEW.captures(sql) {
            let name = &c[1];
            return match self.views.remove(name) {
                Some(_) => Ok(Outcome::Affected(0)),
                None => Err(DriverError::new(format!("View \"{name}\" not found"))
                    .with_code(TABLE_NOT_FOUND)),
            };
        }
        if let Some(c) = INSERT.captures(sql) {
            return self
                .insert(&c[1], &c[2], &c[3], &mut params, last_identity)
                .map(Outcome::Affected);
        }
        if let Some(c) = UPDATE.captures(sql) {
            let filter = c.get(3).map(|m| m.as_str());
            return self.update(&c[1], &c[2], filter, &mut params).map(Outcome::Affected);
        }
        if let Some(c) = DELETE.captures(sql) {
            let filter = c.get(2).map(|m| m.as_str());
            return self.delete(&c[1], filter, &mut params).map(Outcome::Affected);
        }
        if let Some(c) = SELECT.captures(sql) {
            let filter = c.get(3).map(|m| m.as_str());
            return self.select(&c[1], &c[2], filter, &mut params).map(Outcome::Rows);
        }
        Err(syntax(sql))
    }

    fn catalog_query(
        &self,
        sql: &str,
        params: &mut Params<'_>,
    ) -> Result<Option<ResultSet>, DriverError> {
        let rows = match sql {
            TABLE_EXISTS => {
                let (name, schema) = (text(&params.take()?), text(&params.take()?));
                let found = schema == DEFAULT_SCHEMA
                    && (self.tables.contains_key(&name) || self.views.contains_key(&name));
                count_rows(usize::from(found))
            }
            VIEW_EXISTS => {
                let (name, schema) = (text(&params.take()?), text(&params.take()?));
                count_rows(usize::from(schema == DEFAULT_SCHEMA && self.views.contains_key(&name)))
            }
            TABLE_COLUMNS => {
                let name = text(&params.take()?);
                let _schema = params.take()?;
                let mut rs = ResultSet::with_columns([
                    "name", "type", "size", "nullable", "precision", "scale", "primary",
                ]);
                if let Some(table) = self.tables.get(&name) {
                    for c in &table.columns {
                        rs.add_row_values(vec![
                            SqlValue::Text(c.name.clone()),
                            SqlValue::Text(c.type_name.clone()),
                            c.size.into(),
                            SqlValue::Int(i64::from(c.nullable)),
                            c.precision.into(),
                            c.scale.into(),
                            SqlValue::Int(i64::from(table.primary_key.contains(&c.name))),
                        ]);
                    }
                }
                rs
            }
            TABLE_INDEXES => {
                let name = text(&params.take()?);
                let _schema = params.take()?;
                let mut rs = ResultSet::with_columns(["indexName", "tableName", "columnName"]);
                for ix in self.indexes.iter().filter(|ix| ix.table == name) {
                    for column in &ix.columns {
                        rs.add_row_values(vec![
                            SqlValue::Text(ix.name.clone()),
                            SqlValue::Text(ix.table.clone()),
                            SqlValue::Text(column.clone()),
                        ]);
                    }
                }
                rs
            }
            INDEX_EXISTS => {
                let table = text(&params.take()?);
                let _schema = params.take()?;
                let name = text(&params.take()?);
                count_rows(
                    self.indexes
                        .iter()
                        .filter(|ix| ix.table == table && ix.name == name)
                        .count(),
                )
            }
            TABLE_FOREIGN_KEYS => {
                let table = text(&params.take()?);
                let _schema = params.take()?;
                let mut rs = ResultSet::with_columns([
                    "foreignKeyName",
                    "primaryKeyTable",
                    "primaryKeyColumn",
                    "foreignKeyTable",
                    "foreignKeyColumn",
                ]);
                for fk in self.foreign_keys.iter().filter(|fk| fk.table == table) {
                    rs.add_row_values(vec![
                        SqlValue::Text(fk.name.clone()),
                        SqlValue::Text(fk.primary_key_table.clone()),
                        SqlValue::Text(fk.primary_key_column.clone()),
                        SqlValue::Text(fk.table.clone()),
                        SqlValue::Text(fk.column.clone()),
                    ]);
                }
                rs
            }
            FOREIGN_KEY_NAME => {
                let table = text(&params.take()?);
                let _schema = params.take()?;
                let column = text(&params.take()?);
                let pk_table = text(&params.take()?);
                let pk_column = text(&params.take()?);
                let mut rs = ResultSet::with_columns(["foreignKeyName"]);
                for fk in self.foreign_keys.iter().filter(|fk| {
                    fk.table == table
                        && fk.column == column
                        && fk.primary_key_table == pk_table
                        && fk.primary_key_column == pk_column
                }) {
                    rs.add_row_values(vec![SqlValue::Text(fk.name.clone())]);
                }
                rs
            }
            _ => return Ok(None),
        };
        Ok(Some(rows))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table, DriverError> {
        self.tables.get_mut(name).ok_or_else(|| not_found(name))
    }

    fn create_table(&mut self, name: &str, body: &str) -> Result<(), DriverError> {
        if self.tables.contains_key(name) || self.views.contains_key(name) {
            return Err(DriverError::new(format!("Table \"{name}\" already exists"))
                .with_code(TABLE_EXISTS_CODE));
        }
        let mut table = Table::default();
        for part in split_top_level(body) {
            if part.to_ascii_uppercase().starts_with("PRIMARY KEY") {
                table.primary_key = QUOTED
                    .captures_iter(&part)
                    .map(|c| c[1].to_string())
                    .collect();
                continue;
            }
            let c = COLUMN_DEF.captures(&part).ok_or_else(|| syntax(&part))?;
            table.columns.push(parse_column(&c[1], &c[2])?);
        }
        for key in table.primary_key.clone() {
            let column = table
                .columns
                .iter_mut()
                .find(|c| c.name == key)
                .ok_or_else(|| {
                    DriverError::new(format!("Column \"{key}\" not found")).with_code(COLUMN_NOT_FOUND)
                })?;
            column.nullable = false;
        }
        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    fn drop_table(&mut self, name: &str) -> Result<(), DriverError> {
        self.tables.remove(name).ok_or_else(|| not_found(name))?;
        self.indexes.retain(|ix| ix.table != name);
        self.foreign_keys.retain(|fk| fk.table != name);
        Ok(())
    }

    fn add_column(&mut self, table: &str, column: &str, ty: &str) -> Result<(), DriverError> {
        let parsed = parse_column(column, ty)?;
        let table = self.table_mut(table)?;
        if table.column(column).is_some() {
            return Err(DriverError::new(format!("Duplicate column name \"{column}\""))
                .with_code(DUPLICATE_COLUMN));
        }
        table.columns.push(parsed);
        Ok(())
    }

    fn alter_column(&mut self, table: &str, column: &str, ty: &str) -> Result<(), DriverError> {
        let parsed = parse_column(column, ty)?;
        let table = self.table_mut(table)?;
        let existing = table
            .columns
            .iter_mut()
            .find(|c| c.name == column)
            .ok_or_else(|| {
                DriverError::new(format!("Column \"{column}\" not found")).with_code(COLUMN_NOT_FOUND)
            })?;
        *existing = parsed;
        Ok(())
    }

    fn create_index(&mut self, name: &str, table: &str, columns: &str) -> Result<(), DriverError> {
        if self.indexes.iter().any(|ix| ix.name == name) {
            return Err(DriverError::new(format!("Index \"{name}\" already exists"))
                .with_code(INDEX_EXISTS_CODE));
        }
        let columns: Vec<String> = QUOTED
            .captures_iter(columns)
            .map(|c| c[1].to_string())
            .collect();
        let target = self.tables.get(table).ok_or_else(|| not_found(table))?;
        if let Some(missing) = columns.iter().find(|c| target.column(c).is_none()) {
            return Err(DriverError::new(format!("Column \"{missing}\" not found"))
                .with_code(COLUMN_NOT_FOUND));
        }
        self.indexes.push(Index {
            name: name.to_string(),
            table: table.to_string(),
            columns,
        });
        Ok(())
    }

    fn drop_index(&mut self, name: &str) -> Result<(), DriverError> {
        let before = self.indexes.len();
        self.indexes.retain(|ix| ix.name != name);
        if self.indexes.len() == before {
            return Err(DriverError::new(format!("Index \"{name}\" not found"))
                .with_code(INDEX_NOT_FOUND));
        }
        Ok(())
    }

    fn add_foreign_key(
        &mut self,
        table: &str,
        column: &str,
        pk_table: &str,
        pk_column: &str,
    ) -> Result<(), DriverError> {
        for (t, c) in [(table, column), (pk_table, pk_column)] {
            let found = self.tables.get(t).ok_or_else(|| not_found(t))?;
            if found.column(c).is_none() {
                return Err(DriverError::new(format!("Column \"{c}\" not found"))
                    .with_code(COLUMN_NOT_FOUND));
            }
        }
        self.constraint_seq += 1;
        self.foreign_keys.push(ForeignKey {
            name: format!("CONSTRAINT_{}", self.constraint_seq),
            table: table.to_string(),
            column: column.to_string(),
            primary_key_table: pk_table.to_string(),
            primary_key_column: pk_column.to_string(),
        });
        Ok(())
    }

    fn drop_constraint(&mut self, table: &str, name: &str) -> Result<(), DriverError> {
        let before = self.foreign_keys.len();
        self.foreign_keys
            .retain(|fk| !(fk.table == table && fk.name == name));
        if self.foreign_keys.len() == before {
            return Err(DriverError::new(format!("Constraint \"{name}\" not found"))
                .with_code(CONSTRAINT_NOT_FOUND));
        }
        Ok(())
    }

    fn create_view(&mut self, name: &str, query: &str) -> Result<(), DriverError> {
        if self.views.contains_key(name) || self.tables.contains_key(name) {
            return Err(DriverError::new(format!("View \"{name}\" already exists"))
                .with_code(TABLE_EXISTS_CODE));
        }
        // validate the defining query against the current catalog
        let mut probe = self.clone();
        probe.run(query, &[], &mut None)?;
        self.views.insert(name.to_string(), query.trim().to_string());
        Ok(())
    }

    fn insert(
        &mut self,
        table_name: &str,
        columns: &str,
        values: &str,
        params: &mut Params<'_>,
        last_identity: &mut Option<i64>,
    ) -> Result<usize, DriverError> {
        let names: Vec<String> = QUOTED
            .captures_iter(columns)
            .map(|c| c[1].to_string())
            .collect();
        let tokens = split_top_level(values);
        if names.len() != tokens.len() {
            return Err(DriverError::new("Column count does not match").with_code(21002));
        }
        let table = self.table_mut(table_name)?;
        let mut row = Row::new();
        for (name, token) in names.iter().zip(&tokens) {
            if table.column(name).is_none() {
                return Err(DriverError::new(format!("Column \"{name}\" not found"))
                    .with_code(COLUMN_NOT_FOUND));
            }
            row.insert(name.clone(), params.resolve(token)?);
        }
        for column in &table.columns {
            let value = row.get(&column.name).cloned().unwrap_or(SqlValue::Null);
            if column.auto_increment && value.is_null() {
                table.next_id += 1;
                row.insert(column.name.clone(), SqlValue::Int(table.next_id));
                *last_identity = Some(table.next_id);
            } else if !column.nullable && value.is_null() {
                return Err(DriverError::new(format!(
                    "NULL not allowed for column \"{}\"",
                    column.name
                ))
                .with_code(NULL_NOT_ALLOWED));
            } else if column.auto_increment
                && let Some(id) = value.as_int()
            {
                table.next_id = table.next_id.max(id);
            }
        }
        table.rows.push(row);
        Ok(1)
    }

    fn update(
        &mut self,
        table_name: &str,
        assignments: &str,
        filter: Option<&str>,
        params: &mut Params<'_>,
    ) -> Result<usize, DriverError> {
        let mut set = Vec::new();
        for part in split_top_level(assignments) {
            let c = EQUALS.captures(&part).ok_or_else(|| syntax(&part))?;
            set.push((c[1].to_string(), params.resolve(&c[2])?));
        }
        let conditions = parse_filter(filter, params)?;
        let table = self.table_mut(table_name)?;
        let mut changed = 0;
        for row in table.rows.iter_mut().filter(|r| matches(r, &conditions)) {
            for (column, value) in &set {
                row.insert(column.clone(), value.clone());
            }
            changed += 1;
        }
        Ok(changed)
    }

    fn delete(
        &mut self,
        table_name: &str,
        filter: Option<&str>,
        params: &mut Params<'_>,
    ) -> Result<usize, DriverError> {
        let conditions = parse_filter(filter, params)?;
        let table = self.table_mut(table_name)?;
        let before = table.rows.len();
        table.rows.retain(|r| !matches(r, &conditions));
        Ok(before - table.rows.len())
    }

    fn select(
        &self,
        projection: &str,
        source: &str,
        filter: Option<&str>,
        params: &mut Params<'_>,
    ) -> Result<ResultSet, DriverError> {
        let (columns, rows) = self.source_rows(source)?;
        let conditions = parse_filter(filter, params)?;
        let rows: Vec<&Row> = rows.iter().filter(|r| matches(r, &conditions)).collect();

        let items = split_top_level(projection);
        if items.len() == 1 && items[0] == "*" {
            let mut rs = ResultSet::with_columns(columns.clone());
            for row in rows {
                rs.add_row_values(
                    columns
                        .iter()
                        .map(|c| row.get(c).cloned().unwrap_or(SqlValue::Null))
                        .collect(),
                );
            }
            return Ok(rs);
        }

        if items.iter().any(|item| AGGREGATE.is_match(item)) {
            let mut names = Vec::new();
            let mut values = Vec::new();
            for item in &items {
                let c = AGGREGATE.captures(item).ok_or_else(|| syntax(item))?;
                let alias = c.get(4).or(c.get(3)).map_or_else(|| c[1].to_string(), |m| m.as_str().to_string());
                let value = if c[1].eq_ignore_ascii_case("COUNT") {
                    SqlValue::Int(i64::try_from(rows.len()).unwrap_or(i64::MAX))
                } else {
                    let column = c.get(3).map(|m| m.as_str()).ok_or_else(|| syntax(item))?;
                    rows.iter()
                        .filter_map(|r| r.get(column))
                        .filter(|v| !v.is_null())
                        .fold(SqlValue::Null, |acc, v| max_value(acc, v.clone()))
                };
                names.push(alias);
                values.push(value);
            }
            let mut rs = ResultSet::with_columns(names);
            rs.add_row_values(values);
            return Ok(rs);
        }

        let mut picked = Vec::new();
        for item in &items {
            let c = PROJECTED.captures(item).ok_or_else(|| syntax(item))?;
            let column = c[1].to_string();
            if !columns.contains(&column) {
                return Err(DriverError::new(format!("Column \"{column}\" not found"))
                    .with_code(COLUMN_NOT_FOUND));
            }
            let alias = c.get(2).map_or_else(|| column.clone(), |m| m.as_str().to_string());
            picked.push((column, alias));
        }
        let mut rs = ResultSet::with_columns(picked.iter().map(|(_, alias)| alias.clone()));
        for row in rows {
            rs.add_row_values(
                picked
                    .iter()
                    .map(|(c, _)| row.get(c).cloned().unwrap_or(SqlValue::Null))
                    .collect(),
            );
        }
        Ok(rs)
    }

    fn source_rows(&self, source: &str) -> Result<(Vec<String>, Vec<Row>), DriverError> {
        if let Some(table) = self.tables.get(source) {
            let columns = table.columns.iter().map(|c| c.name.clone()).collect();
            return Ok((columns, table.rows.clone()));
        }
        if let Some(query) = self.views.get(source) {
            let mut probe = self.clone();
            let Outcome::Rows(rs) = probe.run(query, &[], &mut None)? else {
                return Err(syntax(query));
            };
            let columns: Vec<String> = rs
                .get_column_names()
                .map(|names| names.as_ref().clone())
                .unwrap_or_default();
            let rows = rs
                .results
                .iter()
                .map(|r| columns.iter().cloned().zip(r.values.iter().cloned()).collect())
                .collect();
            return Ok((columns, rows));
        }
        Err(not_found(source))
    }
}

enum Condition {
    Equals(String, SqlValue),
    IsNull(String),
}

fn matches(row: &Row, conditions: &[Condition]) -> bool {
    conditions.iter().all(|cond| match cond {
        Condition::Equals(column, value) => row.get(column).is_some_and(|v| same_value(v, value)),
        Condition::IsNull(column) => row.get(column).is_none_or(SqlValue::is_null),
    })
}

fn same_value(a: &SqlValue, b: &SqlValue) -> bool {
    match (a, b) {
        (SqlValue::Text(x), SqlValue::Text(y)) => x == y,
        _ => match (a.as_int(), b.as_int()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
    }
}

fn parse_filter(filter: Option<&str>, params: &mut Params<'_>) -> Result<Vec<Condition>, DriverError> {
    let Some(filter) = filter else {
        return Ok(Vec::new());
    };
    let mut conditions = Vec::new();
    for part in AND.split(strip_parens(filter)) {
        let part = strip_parens(part);
        if let Some(c) = IS_NULL.captures(part) {
            conditions.push(Condition::IsNull(c[1].to_string()));
        } else if let Some(c) = EQUALS.captures(part) {
            conditions.push(Condition::Equals(c[1].to_string(), params.resolve(&c[2])?));
        } else {
            return Err(syntax(part));
        }
    }
    Ok(conditions)
}

fn strip_parens(s: &str) -> &str {
    let mut s = s.trim();
    while s.starts_with('(') && s.ends_with(')') && balanced(&s[1..s.len() - 1]) {
        s = s[1..s.len() - 1].trim();
    }
    s
}

fn balanced(s: &str) -> bool {
    let mut depth = 0i32;
    for ch in s.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn max_value(acc: SqlValue, v: SqlValue) -> SqlValue {
    match (&acc, &v) {
        (SqlValue::Null, _) => v,
        (SqlValue::Int(a), SqlValue::Int(b)) => SqlValue::Int(*a.max(b)),
        (SqlValue::Text(a), SqlValue::Text(b)) if b > a => v,
        (SqlValue::Float(a), SqlValue::Float(b)) if b > a => v,
        _ => acc,
    }
}

/// Split on commas outside parentheses and quotes.
fn split_top_level(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for ch in s.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(ch);
                current.push(ch);
            }
            (None, '(') => {
                depth += 1;
                current.push(ch);
            }
            (None, ')') => {
                depth -= 1;
                current.push(ch);
            }
            (None, ',') if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            (None, c) => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn parse_literal(token: &str) -> Result<SqlValue, DriverError> {
    let token = token.trim();
    if token.eq_ignore_ascii_case("NULL") {
        return Ok(SqlValue::Null);
    }
    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        return Ok(SqlValue::Text(token[1..token.len() - 1].replace("''", "'")));
    }
    if token.eq_ignore_ascii_case("TRUE") {
        return Ok(SqlValue::Bool(true));
    }
    if token.eq_ignore_ascii_case("FALSE") {
        return Ok(SqlValue::Bool(false));
    }
    if let Ok(n) = token.parse::<i64>() {
        return Ok(SqlValue::Int(n));
    }
    if let Ok(f) = token.parse::<f64>() {
        return Ok(SqlValue::Float(f));
    }
    Err(syntax(token))
}

fn parse_column(name: &str, ty: &str) -> Result<Column, DriverError> {
    let c = COLUMN_TYPE.captures(ty.trim()).ok_or_else(|| syntax(ty))?;
    let raw = c[1].to_ascii_uppercase();
    let first = c.get(2).and_then(|m| m.as_str().parse::<i64>().ok());
    let second = c.get(3).and_then(|m| m.as_str().parse::<i64>().ok());
    let auto_increment = c.get(4).is_some_and(|m| !m.as_str().trim().is_empty());
    let not_null = c
        .get(5)
        .is_some_and(|m| m.as_str().eq_ignore_ascii_case("NOT NULL"));
    let type_name = match raw.as_str() {
        "INT" => "INTEGER".to_string(),
        other => other.to_string(),
    };
    let (size, precision, scale) = match type_name.as_str() {
        "DECIMAL" | "NUMERIC" => (None, first, second),
        _ => (first, None, None),
    };
    Ok(Column {
        name: name.to_string(),
        type_name,
        size,
        precision,
        scale,
        nullable: !not_null,
        auto_increment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(catalog: &mut Catalog, sql: &str, params: &[SqlValue]) -> Outcome {
        catalog.run(sql, params, &mut None).unwrap()
    }

    #[test]
    fn create_insert_select() {
        let mut db = Catalog::default();
        run(
            &mut db,
            r#"CREATE TABLE "pet" ("id" INT AUTO_INCREMENT NOT NULL, "name" VARCHAR(50) NULL, "price" DECIMAL(19,4) NULL, PRIMARY KEY ("id"))"#,
            &[],
        );
        let table = &db.tables["pet"];
        assert_eq!(table.primary_key, vec!["id".to_string()]);
        assert_eq!(table.columns[1].size, Some(50));
        assert_eq!(table.columns[2].precision, Some(19));
        assert_eq!(table.columns[2].scale, Some(4));

        let mut last = None;
        db.run(
            r#"INSERT INTO "pet"("name") VALUES (?)"#,
            &[SqlValue::Text("Rex".into())],
            &mut last,
        )
        .unwrap();
        assert_eq!(last, Some(1));

        let Outcome::Rows(rs) = run(
            &mut db,
            r#"SELECT MAX("id") AS "id" FROM "pet""#,
            &[],
        ) else {
            panic!("expected rows");
        };
        assert_eq!(rs.scalar_int("id"), Some(1));

        let Outcome::Rows(rs) = run(
            &mut db,
            r#"SELECT * FROM "pet" WHERE ("name"='Rex')"#,
            &[],
        ) else {
            panic!("expected rows");
        };
        assert_eq!(rs.len(), 1);
    }

    #[test]
    fn splits_respect_parens_and_quotes() {
        assert_eq!(
            split_top_level(r#""a" DECIMAL(19,4) NULL, 'x,y', "b""#),
            vec![r#""a" DECIMAL(19,4) NULL"#, "'x,y'", r#""b""#]
        );
    }

    #[test]
    fn unknown_statement_is_syntax_error() {
        let mut db = Catalog::default();
        let err = db.run("VACUUM", &[], &mut None).err().unwrap();
        assert_eq!(err.code, Some(SYNTAX_ERROR));
    }
}
