//! Declarative field and migration descriptors exchanged with the data-model layer.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AdapterError;
use crate::types::FieldType;

/// Engine-agnostic description of one column.
///
/// ```rust
/// use h2_middleware::prelude::*;
///
/// let name = FieldDescriptor::new("name", FieldType::Text).size(50);
/// assert_eq!(H2Formatter::render_type(&name), "VARCHAR(50) NULL");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, deserialize_with = "lenient_u32", skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32", skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32", skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    /// `None` renders as NULL-allowed.
    #[serde(default, deserialize_with = "lenient_bool", skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub primary: bool,
    /// Virtual one-to-many association; never materialized as a column.
    #[serde(default, deserialize_with = "lenient_flag")]
    pub one_to_many: bool,
}

impl FieldDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: impl Into<FieldType>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            size: None,
            scale: None,
            precision: None,
            nullable: None,
            primary: false,
            one_to_many: false,
        }
    }

    #[must_use]
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    #[must_use]
    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    #[must_use]
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    #[must_use]
    pub fn one_to_many(mut self) -> Self {
        self.one_to_many = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintDescriptor {
    /// Only `foreignKey` constraints are applied; other kinds are ignored.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub foreign_key_field: String,
    #[serde(default)]
    pub primary_key_table: String,
    #[serde(default)]
    pub primary_key_field: String,
}

impl ConstraintDescriptor {
    pub const FOREIGN_KEY: &'static str = "foreignKey";

    #[must_use]
    pub fn foreign_key(
        foreign_key_field: impl Into<String>,
        primary_key_table: impl Into<String>,
        primary_key_field: impl Into<String>,
    ) -> Self {
        Self {
            kind: Self::FOREIGN_KEY.to_string(),
            foreign_key_field: foreign_key_field.into(),
            primary_key_table: primary_key_table.into(),
            primary_key_field: primary_key_field.into(),
        }
    }

    #[must_use]
    pub fn is_foreign_key(&self) -> bool {
        self.kind == Self::FOREIGN_KEY
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    #[serde(deserialize_with = "one_or_many")]
    pub columns: Vec<String>,
}

impl IndexDescriptor {
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Desired schema state of one table at one version.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationDescriptor {
    pub applies_to: String,
    #[serde(default)]
    pub model: Option<String>,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub add: Vec<FieldDescriptor>,
    #[serde(default)]
    pub remove: Vec<FieldDescriptor>,
    #[serde(default)]
    pub change: Vec<FieldDescriptor>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDescriptor>,
    #[serde(default)]
    pub indexes: Vec<IndexDescriptor>,
    /// Set by the engine when this version was already applied.
    #[serde(default)]
    pub updated: bool,
}

impl MigrationDescriptor {
    #[must_use]
    pub fn new(applies_to: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            applies_to: applies_to.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn add(mut self, field: FieldDescriptor) -> Self {
        self.add.push(field);
        self
    }

    #[must_use]
    pub fn constraint(mut self, constraint: ConstraintDescriptor) -> Self {
        self.constraints.push(constraint);
        self
    }

    #[must_use]
    pub fn index(mut self, index: IndexDescriptor) -> Self {
        self.indexes.push(index);
        self
    }

    /// Parse a descriptor from its JSON wire form.
    ///
    /// # Errors
    /// Returns `AdapterError::SchemaError` if the JSON is not a valid descriptor.
    pub fn from_json(json: &str) -> Result<Self, AdapterError> {
        serde_json::from_str(json)
            .map_err(|e| AdapterError::SchemaError(format!("invalid migration descriptor: {e}")))
    }
}

/// One row of the `migrations` bookkeeping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecord {
    pub id: i64,
    pub applies_to: String,
    pub model: Option<String>,
    pub description: Option<String>,
    pub version: String,
}

// Descriptors written by hand often carry sizes as strings ("80") and flags as 0/1.

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u64),
    Text(String),
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<NumberOrText> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrText::Number(n)) => u32::try_from(n).ok(),
        Some(NumberOrText::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolLike {
    Bool(bool),
    Number(i64),
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BoolLike> = Option::deserialize(deserializer)?;
    Ok(raw.map(|v| match v {
        BoolLike::Bool(b) => b,
        BoolLike::Number(n) => n != 0,
    }))
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_bool(deserializer)?.unwrap_or(false))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(column) => vec![column],
        OneOrMany::Many(columns) => columns,
    })
}
