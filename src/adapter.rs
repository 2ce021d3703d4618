//! The H2 data adapter: one reserved connection, statement execution and transactions.

mod identity;
mod transaction;

use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;

use crate::config::{AdapterOptions, PoolSettings};
use crate::error::AdapterError;
use crate::formatter::{H2Formatter, Renders};
use crate::pool::{PoolRegistry, PooledConnection};
use crate::prepare::prepare_statement;
use crate::query::QueryExpression;
use crate::results::ResultSet;
use crate::types::SqlValue;

pub use transaction::TransactionState;

/// Something [`H2Adapter::execute`] can run: raw SQL text or a query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Sql(String),
    Expression(QueryExpression),
}

impl From<&str> for Statement {
    fn from(sql: &str) -> Self {
        Statement::Sql(sql.to_string())
    }
}

impl From<String> for Statement {
    fn from(sql: String) -> Self {
        Statement::Sql(sql)
    }
}

impl From<QueryExpression> for Statement {
    fn from(expr: QueryExpression) -> Self {
        Statement::Expression(expr)
    }
}

impl From<&QueryExpression> for Statement {
    fn from(expr: &QueryExpression) -> Self {
        Statement::Expression(expr.clone())
    }
}

/// Outcome of [`H2Adapter::execute`].
#[derive(Debug, Clone)]
pub enum ExecuteResult {
    /// Rows of a `SELECT`.
    Rows(ResultSet),
    /// Affected-row count of any other statement.
    Affected(usize),
}

impl ExecuteResult {
    /// Rows of a `SELECT`; an empty set for update counts.
    #[must_use]
    pub fn into_rows(self) -> ResultSet {
        match self {
            ExecuteResult::Rows(rows) => rows,
            ExecuteResult::Affected(_) => ResultSet::default(),
        }
    }

    #[must_use]
    pub fn affected(&self) -> usize {
        match self {
            ExecuteResult::Rows(rows) => rows.len(),
            ExecuteResult::Affected(count) => *count,
        }
    }
}

/// Adapter bound to one H2 database.
///
/// Holds at most one reserved connection between [`open`](H2Adapter::open) and
/// [`close`](H2Adapter::close); every operation opens lazily. An adapter is not meant to
/// be shared between concurrent callers: give each task its own adapter over the same
/// [`PoolRegistry`].
pub struct H2Adapter {
    options: AdapterOptions,
    settings: PoolSettings,
    registry: Arc<PoolRegistry>,
    connection: Option<PooledConnection>,
    transaction: TransactionState,
    formatter: H2Formatter,
}

impl std::fmt::Debug for H2Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("H2Adapter")
            .field("target", &self.settings.target)
            .field("open", &self.connection.is_some())
            .field("transaction", &self.transaction)
            .finish_non_exhaustive()
    }
}

impl H2Adapter {
    /// Create an adapter; no connection is made until first use.
    ///
    /// # Errors
    /// Returns `AdapterError::ConfigError` if the options do not resolve to a target.
    pub fn new(options: AdapterOptions, registry: Arc<PoolRegistry>) -> Result<Self, AdapterError> {
        let settings = options.pool_settings()?;
        Ok(Self {
            options,
            settings,
            registry,
            connection: None,
            transaction: TransactionState::Idle,
            formatter: H2Formatter::new(),
        })
    }

    #[must_use]
    pub fn options(&self) -> &AdapterOptions {
        &self.options
    }

    #[must_use]
    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    #[must_use]
    pub fn formatter(&self) -> &H2Formatter {
        &self.formatter
    }

    /// Replace the formatter, e.g. to register extra function translations.
    pub fn set_formatter(&mut self, formatter: H2Formatter) {
        self.formatter = formatter;
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    #[must_use]
    pub fn transaction_state(&self) -> TransactionState {
        self.transaction
    }

    /// Reserve a connection if none is held.
    ///
    /// # Errors
    /// Returns `AdapterError::ConnectionError` if the pool cannot be created or a
    /// connection cannot be reserved.
    pub async fn open(&mut self) -> Result<(), AdapterError> {
        if self.connection.is_some() {
            return Ok(());
        }
        let conn = self.registry.reserve(&self.settings).await?;
        self.connection = Some(conn);
        Ok(())
    }

    /// Release the held connection back to its pool.
    ///
    /// A transaction left active is rolled back first and auto-commit is restored; those
    /// failures are logged. The handle is cleared in every case, so this never fails.
    ///
    /// # Errors
    /// None at present; the `Result` keeps the signature aligned with [`open`](H2Adapter::open).
    pub async fn close(&mut self) -> Result<(), AdapterError> {
        let Some(mut conn) = self.connection.take() else {
            return Ok(());
        };
        if self.transaction.is_active() {
            self.transaction = TransactionState::Idle;
            if let Err(e) = conn.rollback().await {
                tracing::warn!(db = %self.settings.target, error = %e, "rollback on close failed");
            }
            if let Err(e) = conn.set_auto_commit(true).await {
                tracing::warn!(db = %self.settings.target, error = %e, "restoring auto-commit on close failed");
            }
        }
        drop(conn);
        tracing::debug!(db = %self.settings.target, "released connection");
        Ok(())
    }

    /// Run raw SQL or a query expression.
    ///
    /// Statements starting with `SELECT` return rows; anything else returns the
    /// affected-row count.
    ///
    /// # Errors
    /// Returns `AdapterError::FormatError` for empty SQL or an expression that cannot be
    /// rendered, connection errors from [`open`](H2Adapter::open), and driver errors verbatim.
    pub async fn execute(
        &mut self,
        statement: impl Into<Statement>,
        params: &[SqlValue],
    ) -> Result<ExecuteResult, AdapterError> {
        let sql = match statement.into() {
            Statement::Sql(sql) => sql,
            Statement::Expression(expr) => self.formatter.render(&expr)?,
        };
        if sql.trim().is_empty() {
            return Err(AdapterError::FormatError("SQL statement may not be empty".into()));
        }
        if is_select(&sql) {
            self.query(&sql, params).await.map(ExecuteResult::Rows)
        } else {
            self.execute_update(&sql, params).await.map(ExecuteResult::Affected)
        }
    }

    /// Run a row-returning statement.
    ///
    /// # Errors
    /// Connection errors from [`open`](H2Adapter::open) and driver errors verbatim.
    pub async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<ResultSet, AdapterError> {
        let conn = self.reserved().await?;
        let started = Instant::now();
        let result = conn.query(sql, params).await;
        self.log_statement(sql, params, started);
        Ok(result?)
    }

    /// Run a statement (or `;`-separated batch) that returns an affected-row count.
    ///
    /// # Errors
    /// Connection errors from [`open`](H2Adapter::open) and driver errors verbatim.
    pub async fn execute_update(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<usize, AdapterError> {
        let conn = self.reserved().await?;
        let started = Instant::now();
        let result = conn.execute_update(sql, params).await;
        self.log_statement(sql, params, started);
        Ok(result?)
    }

    /// Batches are not supported; group statements with
    /// [`execute_in_transaction`](H2Adapter::execute_in_transaction).
    ///
    /// # Errors
    /// Always returns `AdapterError::Unimplemented`.
    pub async fn execute_batch(&mut self, _statements: &[Statement]) -> Result<(), AdapterError> {
        Err(AdapterError::Unimplemented(
            "batch execution is obsolete; use execute_in_transaction instead".into(),
        ))
    }

    /// Offset of the database clock, e.g. `+02:00`.
    ///
    /// # Errors
    /// Connection and driver errors; `SchemaError` if the probe returns no value.
    pub async fn database_timezone(&mut self) -> Result<String, AdapterError> {
        let rows = self
            .query(
                r#"SELECT FORMATDATETIME(CURRENT_TIMESTAMP(),'XXX') as "timezone""#,
                &[],
            )
            .await?;
        rows.first()
            .and_then(|row| row.text("timezone"))
            .ok_or_else(|| AdapterError::SchemaError("database returned no timezone".into()))
    }

    async fn reserved(&mut self) -> Result<&mut PooledConnection, AdapterError> {
        self.open().await?;
        self.connection
            .as_mut()
            .ok_or_else(|| AdapterError::ConnectionError("no reserved connection".into()))
    }

    fn log_statement(&self, sql: &str, params: &[SqlValue], started: Instant) {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        if self.options.statement_logging {
            let text = prepare_statement(sql, params).map_or_else(|_| sql.to_string(), |s| s.into_owned());
            tracing::info!(elapsed_ms, params = ?params, "SQL: {text}");
        } else {
            tracing::debug!(elapsed_ms, "SQL: {sql}");
        }
    }
}

impl Drop for H2Adapter {
    fn drop(&mut self) {
        if self.transaction.is_active()
            && let Some(mut conn) = self.connection.take()
            && let Ok(handle) = Handle::try_current()
        {
            tracing::warn!(db = %self.settings.target, "adapter dropped inside a transaction; rolling back");
            let target = self.settings.target.clone();
            handle.spawn(async move {
                if let Err(e) = conn.rollback().await {
                    tracing::warn!(db = %target, error = %e, "rollback on drop failed");
                }
                if let Err(e) = conn.set_auto_commit(true).await {
                    tracing::warn!(db = %target, error = %e, "restoring auto-commit on drop failed");
                }
            });
        }
    }
}

fn is_select(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("SELECT"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_detection() {
        assert!(is_select("SELECT 1"));
        assert!(is_select("  select * from t"));
        assert!(!is_select("INSERT INTO t VALUES (1)"));
        assert!(!is_select("sel"));
        assert!(!is_select("WITH x AS (SELECT 1) SELECT * FROM x"));
    }

    #[test]
    fn execute_result_shapes() {
        assert_eq!(ExecuteResult::Affected(3).affected(), 3);
        assert!(ExecuteResult::Affected(3).into_rows().is_empty());
    }
}
