//! Abstract query expressions rendered by a dialect formatter.
//!
//! ```rust
//! use h2_middleware::prelude::*;
//!
//! let q = QueryExpression::select("pet")
//!     .field(Expr::field("name"))
//!     .filter(Expr::field("id").eq(SqlValue::Int(7)))
//!     .build();
//! assert_eq!(
//!     H2Formatter::new().render(&q)?,
//!     r#"SELECT "name" FROM "pet" WHERE ("id"=7)"#
//! );
//! # Ok::<(), AdapterError>(())
//! ```

use crate::types::SqlValue;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpression {
    Select(SelectQuery),
    Insert(InsertQuery),
    Update(UpdateQuery),
    Delete(DeleteQuery),
}

impl QueryExpression {
    #[must_use]
    pub fn select(table: impl Into<String>) -> SelectBuilder {
        SelectBuilder {
            query: SelectQuery {
                from: table.into(),
                ..SelectQuery::default()
            },
        }
    }

    #[must_use]
    pub fn insert<I, S>(table: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (S, Expr)>,
        S: Into<String>,
    {
        QueryExpression::Insert(InsertQuery {
            into: table.into(),
            values: values.into_iter().map(|(c, e)| (c.into(), e)).collect(),
        })
    }

    #[must_use]
    pub fn update<I, S>(table: impl Into<String>, set: I, filter: Option<Expr>) -> Self
    where
        I: IntoIterator<Item = (S, Expr)>,
        S: Into<String>,
    {
        QueryExpression::Update(UpdateQuery {
            table: table.into(),
            set: set.into_iter().map(|(c, e)| (c.into(), e)).collect(),
            filter,
        })
    }

    #[must_use]
    pub fn delete(table: impl Into<String>, filter: Option<Expr>) -> Self {
        QueryExpression::Delete(DeleteQuery {
            from: table.into(),
            filter,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub from: String,
    pub distinct: bool,
    /// Empty selects every column.
    pub fields: Vec<SelectField>,
    pub filter: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectField {
    pub expr: Expr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: Expr,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    pub into: String,
    pub values: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    pub table: String,
    pub set: Vec<(String, Expr)>,
    pub filter: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    pub from: String,
    pub filter: Option<Expr>,
}

/// Fluent builder for [`SelectQuery`].
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    query: SelectQuery,
}

impl SelectBuilder {
    #[must_use]
    pub fn field(mut self, expr: Expr) -> Self {
        self.query.fields.push(SelectField { expr, alias: None });
        self
    }

    #[must_use]
    pub fn field_as(mut self, expr: Expr, alias: impl Into<String>) -> Self {
        self.query.fields.push(SelectField {
            expr,
            alias: Some(alias.into()),
        });
        self
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.query.distinct = true;
        self
    }

    /// Set the WHERE clause; repeated calls are combined with AND.
    #[must_use]
    pub fn filter(mut self, expr: Expr) -> Self {
        self.query.filter = Some(match self.query.filter.take() {
            Some(existing) => Expr::And(vec![existing, expr]),
            None => expr,
        });
        self
    }

    #[must_use]
    pub fn group_by(mut self, expr: Expr) -> Self {
        self.query.group_by.push(expr);
        self
    }

    #[must_use]
    pub fn order_by(mut self, expr: Expr, descending: bool) -> Self {
        self.query.order_by.push(OrderBy { expr, descending });
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.query.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.query.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn build(self) -> QueryExpression {
        QueryExpression::Select(self.query)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference, optionally qualified (`table.column`).
    Field(String),
    Value(SqlValue),
    /// Named scalar or aggregate function; translated through the formatter's function table.
    Function { name: String, args: Vec<Expr> },
    Compare {
        left: Box<Expr>,
        op: CompareOp,
        right: Box<Expr>,
    },
    Arithmetic {
        left: Box<Expr>,
        op: ArithmeticOp,
        right: Box<Expr>,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    In { expr: Box<Expr>, list: Vec<Expr> },
    Like { expr: Box<Expr>, pattern: String },
}

impl Expr {
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Expr::Field(name.into())
    }

    #[must_use]
    pub fn value(value: impl Into<SqlValue>) -> Self {
        Expr::Value(value.into())
    }

    #[must_use]
    pub fn func<I>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = Expr>,
    {
        Expr::Function {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    fn compare(self, op: CompareOp, right: impl Into<Expr>) -> Self {
        Expr::Compare {
            left: Box::new(self),
            op,
            right: Box::new(right.into()),
        }
    }

    #[must_use]
    pub fn eq(self, right: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Eq, right)
    }

    #[must_use]
    pub fn ne(self, right: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Ne, right)
    }

    #[must_use]
    pub fn gt(self, right: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Gt, right)
    }

    #[must_use]
    pub fn ge(self, right: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Ge, right)
    }

    #[must_use]
    pub fn lt(self, right: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Lt, right)
    }

    #[must_use]
    pub fn le(self, right: impl Into<Expr>) -> Self {
        self.compare(CompareOp::Le, right)
    }

    #[must_use]
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut items) => {
                items.push(other);
                Expr::And(items)
            }
            first => Expr::And(vec![first, other]),
        }
    }

    #[must_use]
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut items) => {
                items.push(other);
                Expr::Or(items)
            }
            first => Expr::Or(vec![first, other]),
        }
    }

    #[must_use]
    pub fn in_list<I>(self, list: I) -> Self
    where
        I: IntoIterator<Item = Expr>,
    {
        Expr::In {
            expr: Box::new(self),
            list: list.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn like(self, pattern: impl Into<String>) -> Self {
        Expr::Like {
            expr: Box::new(self),
            pattern: pattern.into(),
        }
    }
}

impl From<SqlValue> for Expr {
    fn from(value: SqlValue) -> Self {
        Expr::Value(value)
    }
}
