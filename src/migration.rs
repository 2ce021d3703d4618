//! Declarative schema migrations.
//!
//! A run is an ordered list of stages over a shared [`MigrationRun`] state. The driver
//! loop stops at the first error or at the first stage that settles the outcome.

mod stages;

use futures_util::future::BoxFuture;

use crate::adapter::H2Adapter;
use crate::error::AdapterError;
use crate::model::{MigrationDescriptor, MigrationRecord};
use crate::schema::LIST_MIGRATIONS;
use crate::types::SqlValue;

/// Name of the bookkeeping table.
pub const MIGRATIONS_TABLE: &str = "migrations";

/// What a migration run did to its target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The version was recorded before; nothing was executed.
    AlreadyApplied,
    Created,
    /// The table existed; missing columns were added and drifted ones altered.
    Altered,
}

/// Result of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageFlow {
    Continue,
    Finish(MigrationOutcome),
}

/// State threaded through the stages of one run.
#[derive(Debug, Clone)]
pub struct MigrationRun {
    pub descriptor: MigrationDescriptor,
    /// Whether the target table existed when the run inspected it.
    pub target_exists: bool,
    pub outcome: Option<MigrationOutcome>,
}

impl MigrationRun {
    #[must_use]
    pub fn new(descriptor: MigrationDescriptor) -> Self {
        Self {
            descriptor,
            target_exists: false,
            outcome: None,
        }
    }
}

/// One step of the pipeline.
pub type Stage = for<'a> fn(
    &'a mut H2Adapter,
    &'a mut MigrationRun,
) -> BoxFuture<'a, Result<StageFlow, AdapterError>>;

/// Drive `stages` in order over `run`.
///
/// # Errors
/// The first stage error, unchanged.
pub async fn run_stages(
    adapter: &mut H2Adapter,
    run: &mut MigrationRun,
    stages: &[(&'static str, Stage)],
) -> Result<MigrationOutcome, AdapterError> {
    for &(name, stage) in stages {
        tracing::debug!(stage = name, table = %run.descriptor.applies_to, "migration stage");
        if let StageFlow::Finish(outcome) = stage(adapter, run).await? {
            run.outcome = Some(outcome);
            break;
        }
    }
    run.outcome.ok_or_else(|| {
        AdapterError::SchemaError(format!(
            "migration of {} finished without an outcome",
            run.descriptor.applies_to
        ))
    })
}

impl H2Adapter {
    /// Bring the descriptor's table to the described version.
    ///
    /// Applying a version that is already recorded does nothing and sets
    /// `descriptor.updated`.
    /// ```rust,no_run
    /// # use h2_middleware::prelude::*;
    /// # async fn demo(db: &mut H2Adapter) -> Result<(), AdapterError> {
    /// let mut pet = MigrationDescriptor::new("pet", "1.0")
    ///     .add(FieldDescriptor::new("id", FieldType::Counter).primary())
    ///     .add(FieldDescriptor::new("name", FieldType::Text).size(50));
    /// assert_eq!(db.migrate(&mut pet).await?, MigrationOutcome::Created);
    /// assert_eq!(db.migrate(&mut pet).await?, MigrationOutcome::AlreadyApplied);
    /// assert!(pet.updated);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// `SchemaError` for invalid descriptors, `UnsupportedOperation` for column removal or
    /// change requests against an existing table, plus connection and driver errors.
    /// Stages applied before a failure are not undone.
    pub async fn migrate(
        &mut self,
        descriptor: &mut MigrationDescriptor,
    ) -> Result<MigrationOutcome, AdapterError> {
        let mut run = MigrationRun::new(descriptor.clone());
        let outcome = run_stages(self, &mut run, stages::PIPELINE).await?;
        descriptor.updated = run.descriptor.updated;
        Ok(outcome)
    }

    /// Recorded migrations of `applies_to`, oldest first.
    ///
    /// # Errors
    /// Connection and driver errors.
    pub async fn applied_migrations(
        &mut self,
        applies_to: &str,
    ) -> Result<Vec<MigrationRecord>, AdapterError> {
        if !self.table(MIGRATIONS_TABLE).exists().await? {
            return Ok(Vec::new());
        }
        let rows = self.query(LIST_MIGRATIONS, &[SqlValue::from(applies_to)]).await?;
        Ok(rows
            .results
            .iter()
            .map(|row| MigrationRecord {
                id: row.int("id").unwrap_or_default(),
                applies_to: row.text("appliesTo").unwrap_or_default(),
                model: row.text("model"),
                description: row.text("description"),
                version: row.text("version").unwrap_or_default(),
            })
            .collect())
    }
}
