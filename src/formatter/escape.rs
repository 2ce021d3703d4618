use std::fmt::Write as _;

use crate::error::AdapterError;
use crate::types::SqlValue;

const NULL_LITERAL: &str = "NULL";

/// Quote a bare identifier or each part of a `schema.identifier` reference.
///
/// Parts that are already quoted are left alone; embedded quotes are doubled.
#[must_use]
pub fn escape_identifier(name: &str) -> String {
    name.split('.')
        .map(quote_part)
        .collect::<Vec<_>>()
        .join(".")
}

fn quote_part(part: &str) -> String {
    let trimmed = part.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        return trimmed.to_string();
    }
    format!("\"{}\"", trimmed.replace('"', "\"\""))
}

/// Render `value` as an H2 literal.
///
/// With `unquoted` set, text is escaped but not wrapped in quotes (for splicing into
/// an existing literal, e.g. a LIKE pattern).
///
/// # Errors
/// Returns `AdapterError::FormatError` for non-finite floats, which have no SQL literal.
pub fn escape_literal(value: &SqlValue, unquoted: bool) -> Result<String, AdapterError> {
    let literal = match value {
        SqlValue::Null => NULL_LITERAL.to_string(),
        SqlValue::Text(text) if unquoted => text.replace('\'', "''"),
        SqlValue::Text(text) => format!("'{}'", text.replace('\'', "''")),
        SqlValue::Bool(flag) => if *flag { "1" } else { "0" }.to_string(),
        SqlValue::Timestamp(ts) => format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S%:z")),
        SqlValue::Identifier(name) => escape_identifier(name),
        SqlValue::Int(n) => n.to_string(),
        SqlValue::Float(f) if f.is_finite() => f.to_string(),
        SqlValue::Float(f) => {
            return Err(AdapterError::FormatError(format!(
                "{f} cannot be written as a SQL literal"
            )));
        }
        SqlValue::Blob(bytes) => {
            let mut hex = String::with_capacity(bytes.len() * 2 + 3);
            hex.push_str("X'");
            for b in bytes {
                let _ = write!(hex, "{b:02X}");
            }
            hex.push('\'');
            hex
        }
    };
    Ok(literal)
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use super::*;

    #[test]
    fn identifiers() {
        assert_eq!(escape_identifier("pet"), "\"pet\"");
        assert_eq!(escape_identifier("PUBLIC.pet"), "\"PUBLIC\".\"pet\"");
        assert_eq!(escape_identifier("\"pet\""), "\"pet\"");
        assert_eq!(escape_identifier("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn text_literals_double_quotes() {
        let value = SqlValue::Text("O'Brien".into());
        assert_eq!(escape_literal(&value, false).unwrap(), "'O''Brien'");
        assert_eq!(escape_literal(&value, true).unwrap(), "O''Brien");
    }

    #[test]
    fn scalar_literals() {
        assert_eq!(escape_literal(&SqlValue::Null, false).unwrap(), "NULL");
        assert_eq!(escape_literal(&SqlValue::Bool(true), false).unwrap(), "1");
        assert_eq!(escape_literal(&SqlValue::Bool(false), false).unwrap(), "0");
        assert_eq!(escape_literal(&SqlValue::Int(-4), false).unwrap(), "-4");
        assert_eq!(escape_literal(&SqlValue::Float(2.5), false).unwrap(), "2.5");
        assert_eq!(
            escape_literal(&SqlValue::Blob(vec![0x0a, 0xff]), false).unwrap(),
            "X'0AFF'"
        );
        assert_eq!(
            escape_literal(&SqlValue::Identifier("pet.id".into()), false).unwrap(),
            "\"pet\".\"id\""
        );
        assert!(escape_literal(&SqlValue::Float(f64::NAN), false).is_err());
    }

    #[test]
    fn timestamps_carry_signed_offset() {
        let east = FixedOffset::east_opt(2 * 3600).unwrap();
        let ts = east.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            escape_literal(&SqlValue::Timestamp(ts), false).unwrap(),
            "'2024-03-09 07:05:01+02:00'"
        );

        let west = FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap();
        let ts = west.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(
            escape_literal(&SqlValue::Timestamp(ts), false).unwrap(),
            "'2024-12-31 23:59:59-05:30'"
        );

        let utc = FixedOffset::east_opt(0).unwrap();
        let ts = utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            escape_literal(&SqlValue::Timestamp(ts), false).unwrap(),
            "'2000-01-01 00:00:00+00:00'"
        );
    }
}
