//! In-memory stand-in for an H2 server.
//!
//! [`MemoryConnector`] plugs into a [`PoolRegistry`](crate::pool::PoolRegistry) like any
//! driver. Clones share one database, so a test keeps a clone for inspection and hands
//! another to the registry:
//! ```rust
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), h2_middleware::AdapterError> {
//! use h2_middleware::prelude::*;
//! use h2_middleware::test_utils::MemoryConnector;
//!
//! let memory = MemoryConnector::new();
//! let registry = PoolRegistry::shared(memory.clone());
//! let mut db = AdapterOptionsBuilder::path("mem:pets").build(registry)?;
//! db.execute(r#"CREATE TABLE "pet" ("id" INTEGER NOT NULL)"#, &[]).await?;
//! assert_eq!(memory.table_names(), vec!["pet".to_string()]);
//! # Ok(())
//! # }
//! ```

mod engine;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::config::PoolSettings;
use crate::driver::{Connector, NativeConnection};
use crate::error::DriverError;
use crate::prepare::prepare_statement;
use crate::results::ResultSet;
use crate::types::SqlValue;

use engine::{Catalog, Outcome};

pub use engine::Row as MemoryRow;

#[derive(Debug, Default)]
struct Failures {
    connect: bool,
    commit: bool,
    rollback: bool,
    statement: Option<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    catalog: Catalog,
    statements: Vec<String>,
    commits: usize,
    rollbacks: usize,
    auto_commit_changes: Vec<bool>,
    connections_opened: usize,
    failures: Failures,
}

/// Connector for an in-memory database shared by all of its clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        lock(&self.state)
    }

    /// Every statement executed so far, parameters inlined.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    /// Executed `CREATE`, `ALTER` and `DROP` statements.
    #[must_use]
    pub fn ddl_statements(&self) -> Vec<String> {
        self.lock()
            .statements
            .iter()
            .filter(|s| is_ddl(s))
            .cloned()
            .collect()
    }

    pub fn clear_log(&self) {
        self.lock().statements.clear();
    }

    #[must_use]
    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }

    /// Every `set_auto_commit` call, in order.
    #[must_use]
    pub fn auto_commit_changes(&self) -> Vec<bool> {
        self.lock().auto_commit_changes.clone()
    }

    #[must_use]
    pub fn connections_opened(&self) -> usize {
        self.lock().connections_opened
    }

    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.lock().catalog.tables.keys().cloned().collect()
    }

    #[must_use]
    pub fn view_names(&self) -> Vec<String> {
        self.lock().catalog.views.keys().cloned().collect()
    }

    /// Stored rows of `table`, empty if it does not exist.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<MemoryRow> {
        self.lock()
            .catalog
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn index_count(&self, table: &str) -> usize {
        self.lock()
            .catalog
            .indexes
            .iter()
            .filter(|ix| ix.table == table)
            .count()
    }

    /// Fail every statement whose text contains `pattern`.
    pub fn fail_on(&self, pattern: impl Into<String>) {
        self.lock().failures.statement = Some(pattern.into());
    }

    pub fn fail_connect(&self, fail: bool) {
        self.lock().failures.connect = fail;
    }

    pub fn fail_commit(&self, fail: bool) {
        self.lock().failures.commit = fail;
    }

    pub fn fail_rollback(&self, fail: bool) {
        self.lock().failures.rollback = fail;
    }

    pub fn clear_failures(&self) {
        self.lock().failures = Failures::default();
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(
        &self,
        _settings: &PoolSettings,
    ) -> Result<Box<dyn NativeConnection>, DriverError> {
        let mut state = self.lock();
        if state.failures.connect {
            return Err(DriverError::new("Connection is broken: \"refused\"").with_code(90067));
        }
        state.connections_opened += 1;
        Ok(Box::new(MemoryConnection {
            state: Arc::clone(&self.state),
            auto_commit: true,
            snapshot: None,
            last_identity: None,
        }))
    }
}

struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
    auto_commit: bool,
    /// Catalog as of the start of the open transaction.
    snapshot: Option<Catalog>,
    last_identity: Option<i64>,
}

impl MemoryConnection {
    fn run(&mut self, sql: &str, params: &[SqlValue]) -> Result<Outcome, DriverError> {
        let mut state = lock(&self.state);
        let logged = prepare_statement(sql, params).map_or_else(|_| sql.to_string(), |s| s.into_owned());
        state.statements.push(logged);
        if let Some(pattern) = &state.failures.statement
            && sql.contains(pattern.as_str())
        {
            return Err(DriverError::new(format!("General error: injected failure on {pattern}"))
                .with_code(50000));
        }
        let mut last = 0;
        let mut affected = 0;
        let parts = split_statements(sql);
        let batch = parts.len() > 1;
        for part in parts {
            let used = count_params(part);
            let slice = params.get(last..last + used).unwrap_or(&[]);
            last += used;
            match state.catalog.run(part, slice, &mut self.last_identity)? {
                Outcome::Rows(rows) if !batch => return Ok(Outcome::Rows(rows)),
                Outcome::Rows(_) => {}
                Outcome::Affected(n) => affected += n,
            }
        }
        Ok(Outcome::Affected(affected))
    }
}

#[async_trait]
impl NativeConnection for MemoryConnection {
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<ResultSet, DriverError> {
        match self.run(sql, params)? {
            Outcome::Rows(rows) => Ok(rows),
            Outcome::Affected(_) => Ok(ResultSet::default()),
        }
    }

    async fn execute_update(
        &mut self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<usize, DriverError> {
        match self.run(sql, params)? {
            Outcome::Rows(rows) => Ok(rows.len()),
            Outcome::Affected(n) => Ok(n),
        }
    }

    async fn is_valid(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn set_auto_commit(&mut self, enabled: bool) -> Result<(), DriverError> {
        let mut state = lock(&self.state);
        state.auto_commit_changes.push(enabled);
        self.snapshot = if enabled {
            None
        } else {
            Some(state.catalog.clone())
        };
        self.auto_commit = enabled;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        let mut state = lock(&self.state);
        if state.failures.commit {
            return Err(DriverError::new("General error: commit failed").with_code(50000));
        }
        state.commits += 1;
        if !self.auto_commit {
            self.snapshot = Some(state.catalog.clone());
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        let mut state = lock(&self.state);
        if state.failures.rollback {
            return Err(DriverError::new("General error: rollback failed").with_code(50000));
        }
        state.rollbacks += 1;
        if let Some(snapshot) = &self.snapshot {
            state.catalog = snapshot.clone();
        }
        Ok(())
    }
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_ddl(sql: &str) -> bool {
    let head = sql.trim_start().to_ascii_uppercase();
    ["CREATE ", "ALTER ", "DROP "]
        .iter()
        .any(|kw| head.starts_with(kw))
}

fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(';').map(str::trim).filter(|s| !s.is_empty()).collect()
}

fn count_params(sql: &str) -> usize {
    crate::prepare::count_placeholders(sql)
}
