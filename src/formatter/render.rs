use super::escape::{escape_identifier, escape_literal};
use super::{H2Formatter, Renders};
use crate::error::AdapterError;
use crate::query::{
    CompareOp, DeleteQuery, Expr, InsertQuery, QueryExpression, SelectQuery, UpdateQuery,
};
use crate::types::SqlValue;

impl Renders for H2Formatter {
    fn render(&self, expr: &QueryExpression) -> Result<String, AdapterError> {
        match expr {
            QueryExpression::Select(q) => self.render_select(q),
            QueryExpression::Insert(q) => self.render_insert(q),
            QueryExpression::Update(q) => self.render_update(q),
            QueryExpression::Delete(q) => self.render_delete(q),
        }
    }
}

fn malformed(msg: impl Into<String>) -> AdapterError {
    AdapterError::FormatError(msg.into())
}

fn table_name(name: &str) -> Result<String, AdapterError> {
    if name.trim().is_empty() {
        return Err(malformed("query expression has no target table"));
    }
    Ok(escape_identifier(name))
}

impl H2Formatter {
    fn render_select(&self, q: &SelectQuery) -> Result<String, AdapterError> {
        let mut sql = String::from("SELECT ");
        if q.distinct {
            sql.push_str("DISTINCT ");
        }
        if q.fields.is_empty() {
            sql.push('*');
        } else {
            let fields = q
                .fields
                .iter()
                .map(|f| {
                    let rendered = self.render_expr(&f.expr)?;
                    Ok(match &f.alias {
                        Some(alias) => format!("{rendered} AS {}", escape_identifier(alias)),
                        None => rendered,
                    })
                })
                .collect::<Result<Vec<_>, AdapterError>>()?;
            sql.push_str(&fields.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(&table_name(&q.from)?);
        self.push_where(&mut sql, q.filter.as_ref())?;
        if !q.group_by.is_empty() {
            let groups = self.render_list(&q.group_by)?;
            sql.push_str(" GROUP BY ");
            sql.push_str(&groups.join(", "));
        }
        if !q.order_by.is_empty() {
            let orders = q
                .order_by
                .iter()
                .map(|o| {
                    let dir = if o.descending { "DESC" } else { "ASC" };
                    Ok(format!("{} {dir}", self.render_expr(&o.expr)?))
                })
                .collect::<Result<Vec<_>, AdapterError>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }
        if let Some(limit) = q.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = q.offset {
            if q.limit.is_none() {
                return Err(malformed("OFFSET requires LIMIT"));
            }
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        Ok(sql)
    }

    fn render_insert(&self, q: &InsertQuery) -> Result<String, AdapterError> {
        let table = table_name(&q.into)?;
        if q.values.is_empty() {
            return Err(malformed("INSERT without values"));
        }
        let columns: Vec<String> = q.values.iter().map(|(c, _)| escape_identifier(c)).collect();
        let values = q
            .values
            .iter()
            .map(|(_, e)| self.render_expr(e))
            .collect::<Result<Vec<_>, AdapterError>>()?;
        Ok(format!(
            "INSERT INTO {table}({}) VALUES ({})",
            columns.join(", "),
            values.join(", ")
        ))
    }

    fn render_update(&self, q: &UpdateQuery) -> Result<String, AdapterError> {
        let table = table_name(&q.table)?;
        if q.set.is_empty() {
            return Err(malformed("UPDATE without assignments"));
        }
        let assignments = q
            .set
            .iter()
            .map(|(c, e)| Ok(format!("{}={}", escape_identifier(c), self.render_expr(e)?)))
            .collect::<Result<Vec<_>, AdapterError>>()?;
        let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
        self.push_where(&mut sql, q.filter.as_ref())?;
        Ok(sql)
    }

    fn render_delete(&self, q: &DeleteQuery) -> Result<String, AdapterError> {
        let mut sql = format!("DELETE FROM {}", table_name(&q.from)?);
        self.push_where(&mut sql, q.filter.as_ref())?;
        Ok(sql)
    }

    fn push_where(&self, sql: &mut String, filter: Option<&Expr>) -> Result<(), AdapterError> {
        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(&self.render_expr(filter)?);
        }
        Ok(())
    }

    fn render_list(&self, items: &[Expr]) -> Result<Vec<String>, AdapterError> {
        items.iter().map(|e| self.render_expr(e)).collect()
    }

    pub(crate) fn render_expr(&self, expr: &Expr) -> Result<String, AdapterError> {
        match expr {
            Expr::Field(name) => {
                if name.trim().is_empty() {
                    return Err(malformed("empty field reference"));
                }
                Ok(escape_identifier(name))
            }
            Expr::Value(value) => escape_literal(value, false),
            Expr::Function { name, args } => self.render_function(name, args),
            Expr::Compare { left, op, right } => {
                let l = self.render_expr(left)?;
                match (op, right.as_ref()) {
                    (CompareOp::Eq, Expr::Value(SqlValue::Null)) => Ok(format!("({l} IS NULL)")),
                    (CompareOp::Ne, Expr::Value(SqlValue::Null)) => {
                        Ok(format!("({l} IS NOT NULL)"))
                    }
                    _ => Ok(format!("({l}{}{})", op.as_sql(), self.render_expr(right)?)),
                }
            }
            Expr::Arithmetic { left, op, right } => Ok(format!(
                "({}{}{})",
                self.render_expr(left)?,
                op.as_sql(),
                self.render_expr(right)?
            )),
            Expr::And(items) => self.render_logical(items, " AND "),
            Expr::Or(items) => self.render_logical(items, " OR "),
            Expr::Not(inner) => Ok(format!("NOT {}", self.render_expr(inner)?)),
            Expr::IsNull(inner) => Ok(format!("({} IS NULL)", self.render_expr(inner)?)),
            Expr::In { expr, list } => {
                if list.is_empty() {
                    return Err(malformed("IN with an empty list"));
                }
                Ok(format!(
                    "({} IN ({}))",
                    self.render_expr(expr)?,
                    self.render_list(list)?.join(",")
                ))
            }
            Expr::Like { expr, pattern } => Ok(format!(
                "({} LIKE {})",
                self.render_expr(expr)?,
                escape_literal(&SqlValue::Text(pattern.clone()), false)?
            )),
        }
    }

    fn render_logical(&self, items: &[Expr], joiner: &str) -> Result<String, AdapterError> {
        match items {
            [] => Err(malformed("logical expression without operands")),
            [single] => self.render_expr(single),
            _ => Ok(format!("({})", self.render_list(items)?.join(joiner))),
        }
    }

    fn render_function(&self, name: &str, args: &[Expr]) -> Result<String, AdapterError> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(malformed(format!("invalid function name '{name}'")));
        }
        if let Some(arity) = self.functions.arity(name) {
            if args.len() > arity {
                return Err(malformed(format!(
                    "{name}() takes {arity} operand(s), got {}",
                    args.len()
                )));
            }
            let operands = args
                .iter()
                .map(|a| match a {
                    Expr::Value(SqlValue::Null) => Ok(None),
                    other => self.render_expr(other).map(Some),
                })
                .collect::<Result<Vec<_>, AdapterError>>()?;
            if let Some(sql) = self.functions.translate(name, &operands) {
                return Ok(sql);
            }
        }
        let upper = name.to_ascii_uppercase();
        if args.is_empty() && upper == "COUNT" {
            return Ok("COUNT(*)".to_string());
        }
        Ok(format!("{upper}({})", self.render_list(args)?.join(",")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ArithmeticOp;

    fn render(q: &QueryExpression) -> String {
        H2Formatter::new().render(q).unwrap()
    }

    #[test]
    fn select_all() {
        let q = QueryExpression::select("pet").build();
        assert_eq!(render(&q), "SELECT * FROM \"pet\"");
    }

    #[test]
    fn select_with_clauses() {
        let q = QueryExpression::select("pet")
            .distinct()
            .field(Expr::field("pet.name"))
            .field_as(Expr::func("max", [Expr::field("id")]), "id")
            .filter(Expr::field("kind").eq(SqlValue::Text("cat".into())))
            .filter(Expr::field("owner").eq(SqlValue::Null))
            .group_by(Expr::field("pet.name"))
            .order_by(Expr::field("pet.name"), true)
            .limit(10)
            .offset(20)
            .build();
        assert_eq!(
            render(&q),
            "SELECT DISTINCT \"pet\".\"name\", MAX(\"id\") AS \"id\" FROM \"pet\" \
             WHERE ((\"kind\"='cat') AND (\"owner\" IS NULL)) GROUP BY \"pet\".\"name\" \
             ORDER BY \"pet\".\"name\" DESC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn dialect_functions_in_filters() {
        let q = QueryExpression::select("pet")
            .filter(
                Expr::func("mod", [Expr::field("id"), Expr::value(2i64)])
                    .eq(SqlValue::Int(0))
                    .or(Expr::func("length", [Expr::field("name")]).gt(SqlValue::Int(3))),
            )
            .build();
        assert_eq!(
            render(&q),
            "SELECT * FROM \"pet\" WHERE ((MOD(\"id\",2)=0) OR (LENGTH(\"name\")>3))"
        );
    }

    #[test]
    fn null_operand_renders_zero() {
        let q = QueryExpression::select("t")
            .field(Expr::func("bit", [Expr::field("flags"), Expr::Value(SqlValue::Null)]))
            .build();
        assert_eq!(render(&q), "SELECT 0 FROM \"t\"");
    }

    #[test]
    fn dml() {
        let insert = QueryExpression::insert(
            "pet",
            [("name", Expr::value("O'Brien")), ("age", Expr::value(3i64))],
        );
        assert_eq!(
            render(&insert),
            "INSERT INTO \"pet\"(\"name\", \"age\") VALUES ('O''Brien', 3)"
        );

        let update = QueryExpression::update(
            "pet",
            [(
                "age",
                Expr::Arithmetic {
                    left: Box::new(Expr::field("age")),
                    op: ArithmeticOp::Add,
                    right: Box::new(Expr::value(1i64)),
                },
            )],
            Some(Expr::field("id").in_list([Expr::value(1i64), Expr::value(2i64)])),
        );
        assert_eq!(
            render(&update),
            "UPDATE \"pet\" SET \"age\"=(\"age\"+1) WHERE (\"id\" IN (1,2))"
        );

        let delete = QueryExpression::delete("pet", Some(Expr::field("name").like("Rex%")));
        assert_eq!(render(&delete), "DELETE FROM \"pet\" WHERE (\"name\" LIKE 'Rex%')");
    }

    #[test]
    fn malformed_expressions_fail() {
        let f = H2Formatter::new();
        assert!(f.render(&QueryExpression::select(" ").build()).is_err());
        assert!(f.render(&QueryExpression::insert("t", Vec::<(String, Expr)>::new())).is_err());
        assert!(f.render(&QueryExpression::update("t", Vec::<(String, Expr)>::new(), None)).is_err());
        let empty_in = QueryExpression::select("t")
            .filter(Expr::field("a").in_list(Vec::new()))
            .build();
        assert!(matches!(f.render(&empty_in), Err(AdapterError::FormatError(_))));
        let bad_fn = QueryExpression::select("t")
            .field(Expr::func("drop table", []))
            .build();
        assert!(f.render(&bad_fn).is_err());
        let too_many = QueryExpression::select("t")
            .field(Expr::func("length", [Expr::field("a"), Expr::field("b")]))
            .build();
        assert!(f.render(&too_many).is_err());
        let offset_only = QueryExpression::select("t").offset(5).build();
        assert!(f.render(&offset_only).is_err());
    }

    #[test]
    fn count_without_operands() {
        let q = QueryExpression::select("t")
            .field_as(Expr::func("count", []), "count")
            .build();
        assert_eq!(render(&q), "SELECT COUNT(*) AS \"count\" FROM \"t\"");
    }
}
