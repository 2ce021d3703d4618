//! Client-side statement preparation for drivers that cannot bind parameters.

use std::borrow::Cow;

mod scanner;

use crate::error::AdapterError;
use crate::formatter::escape_literal;
use crate::types::SqlValue;

/// Number of `?` placeholders in `sql`, ignoring those inside quotes and comments.
#[must_use]
pub fn count_placeholders(sql: &str) -> usize {
    scanner::placeholder_offsets(sql).len()
}

/// Replace each `?` placeholder with the escaped literal of the matching parameter.
///
/// Placeholders inside string literals, quoted identifiers and comments are left alone.
/// Returns a borrowed `Cow` when there is nothing to inline.
/// ```rust
/// use h2_middleware::prelude::*;
///
/// let sql = prepare_statement(
///     r#"SELECT * FROM "pet" WHERE "name"=? AND "note"='why?'"#,
///     &[SqlValue::Text("O'Brien".into())],
/// )?;
/// assert_eq!(sql, r#"SELECT * FROM "pet" WHERE "name"='O''Brien' AND "note"='why?'"#);
/// # Ok::<(), AdapterError>(())
/// ```
///
/// # Errors
/// Returns `AdapterError::FormatError` when the placeholder count differs from the
/// parameter count or a parameter cannot be escaped.
pub fn prepare_statement<'a>(
    sql: &'a str,
    params: &[SqlValue],
) -> Result<Cow<'a, str>, AdapterError> {
    let offsets = scanner::placeholder_offsets(sql);
    if offsets.len() != params.len() {
        return Err(AdapterError::FormatError(format!(
            "statement expects {} parameter(s), got {}",
            offsets.len(),
            params.len()
        )));
    }
    if offsets.is_empty() {
        return Ok(Cow::Borrowed(sql));
    }

    let mut out = String::with_capacity(sql.len() + params.len() * 8);
    let mut last = 0;
    for (offset, param) in offsets.iter().zip(params) {
        out.push_str(&sql[last..*offset]);
        out.push_str(&escape_literal(param, false)?);
        last = offset + 1;
    }
    out.push_str(&sql[last..]);
    Ok(Cow::Owned(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inlines_in_order() {
        let sql = "INSERT INTO \"t\" (\"a\",\"b\",\"c\") VALUES (?,?,?)";
        let res = prepare_statement(
            sql,
            &[SqlValue::Int(1), SqlValue::Null, SqlValue::Bool(true)],
        )
        .unwrap();
        assert_eq!(res, "INSERT INTO \"t\" (\"a\",\"b\",\"c\") VALUES (1,NULL,1)");
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select '?', \"wh?\" -- ?\n/* ? /* ? */ ? */ from t where a = ?";
        assert_eq!(count_placeholders(sql), 1);
        let res = prepare_statement(sql, &[SqlValue::Int(5)]).unwrap();
        assert_eq!(
            res,
            "select '?', \"wh?\" -- ?\n/* ? /* ? */ ? */ from t where a = 5"
        );
    }

    #[test]
    fn escaped_quotes_keep_literal_open() {
        let sql = "select 'it''s ?' from t where a = ?";
        assert_eq!(count_placeholders(sql), 1);
    }

    #[test]
    fn preserves_multibyte_text() {
        let res = prepare_statement("select 'é' , ?", &[SqlValue::Text("ü".into())]).unwrap();
        assert_eq!(res, "select 'é' , 'ü'");
    }

    #[test]
    fn borrowed_without_params() {
        let res = prepare_statement("SELECT 1", &[]).unwrap();
        assert!(matches!(res, Cow::Borrowed(_)));
    }

    #[test]
    fn count_mismatch_is_format_error() {
        let err = prepare_statement("select ?", &[]).unwrap_err();
        assert!(matches!(err, AdapterError::FormatError(_)));
        assert!(prepare_statement("select 1", &[SqlValue::Int(1)]).is_err());
    }
}
