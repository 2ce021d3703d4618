use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Values that can be bound as statement parameters, escaped as SQL literals, or returned
/// in a result row.
///
/// The set is closed so that literal escaping is a total match:
/// ```rust
/// use h2_middleware::prelude::*;
///
/// let params = vec![
///     SqlValue::Int(1),
///     SqlValue::Text("O'Brien".into()),
///     SqlValue::Bool(true),
///     SqlValue::Identifier("pet.name".into()),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value
    Null,
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp carrying its own UTC offset
    Timestamp(DateTime<FixedOffset>),
    /// Reference to a column or `schema.object`, rendered as a quoted name
    Identifier(String),
    /// Binary data
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SqlValue::Int(value) => Some(*value),
            SqlValue::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            SqlValue::Bool(value) => Some(i64::from(*value)),
            SqlValue::Text(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let SqlValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Catalog views report flags as booleans, integers or `YES`/`NO` text.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(value) => Some(*value),
            SqlValue::Int(1) => Some(true),
            SqlValue::Int(0) => Some(false),
            SqlValue::Text(value) => match value.to_ascii_uppercase().as_str() {
                "YES" | "TRUE" | "1" => Some(true),
                "NO" | "FALSE" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SqlValue::Float(value) => Some(*value),
            SqlValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            SqlValue::Timestamp(value) => Some(value.naive_local()),
            SqlValue::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.3f"))
                .ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let SqlValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// Symbolic field type tags understood by the dialect formatter.
///
/// Unknown tags survive deserialization as [`FieldType::Other`] and render as `INTEGER`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Boolean,
    Byte,
    Number,
    Float,
    Counter,
    Currency,
    Decimal,
    Date,
    DateTime,
    Time,
    Integer,
    Duration,
    BigInteger,
    Url,
    Text,
    Note,
    Image,
    Binary,
    Guid,
    Short,
    Other(String),
}

impl FieldType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Boolean => "Boolean",
            FieldType::Byte => "Byte",
            FieldType::Number => "Number",
            FieldType::Float => "Float",
            FieldType::Counter => "Counter",
            FieldType::Currency => "Currency",
            FieldType::Decimal => "Decimal",
            FieldType::Date => "Date",
            FieldType::DateTime => "DateTime",
            FieldType::Time => "Time",
            FieldType::Integer => "Integer",
            FieldType::Duration => "Duration",
            FieldType::BigInteger => "BigInteger",
            FieldType::Url => "URL",
            FieldType::Text => "Text",
            FieldType::Note => "Note",
            FieldType::Image => "Image",
            FieldType::Binary => "Binary",
            FieldType::Guid => "Guid",
            FieldType::Short => "Short",
            FieldType::Other(tag) => tag,
        }
    }
}

impl From<&str> for FieldType {
    fn from(tag: &str) -> Self {
        match tag {
            "Boolean" => FieldType::Boolean,
            "Byte" => FieldType::Byte,
            "Number" => FieldType::Number,
            "Float" => FieldType::Float,
            "Counter" => FieldType::Counter,
            "Currency" => FieldType::Currency,
            "Decimal" => FieldType::Decimal,
            "Date" => FieldType::Date,
            "DateTime" => FieldType::DateTime,
            "Time" => FieldType::Time,
            "Integer" => FieldType::Integer,
            "Duration" => FieldType::Duration,
            "BigInteger" => FieldType::BigInteger,
            "URL" => FieldType::Url,
            "Text" => FieldType::Text,
            "Note" => FieldType::Note,
            "Image" => FieldType::Image,
            "Binary" => FieldType::Binary,
            "Guid" => FieldType::Guid,
            "Short" => FieldType::Short,
            other => FieldType::Other(other.to_string()),
        }
    }
}

impl From<String> for FieldType {
    fn from(tag: String) -> Self {
        FieldType::from(tag.as_str())
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.as_str().to_string()
    }
}
