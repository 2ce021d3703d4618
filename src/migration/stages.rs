use futures_util::future::BoxFuture;

use super::{MIGRATIONS_TABLE, MigrationOutcome, MigrationRun, Stage, StageFlow};
use crate::adapter::H2Adapter;
use crate::error::AdapterError;
use crate::formatter::catalog_type;
use crate::model::{FieldDescriptor, MigrationDescriptor};
use crate::schema::{MIGRATION_APPLIED, RECORD_MIGRATION};
use crate::types::{FieldType, SqlValue};

type StageResult<'a> = BoxFuture<'a, Result<StageFlow, AdapterError>>;

pub(super) const PIPELINE: &[(&str, Stage)] = &[
    ("validate", validate),
    ("bookkeeping", ensure_bookkeeping),
    ("applied", check_applied),
    ("target", inspect_target),
    ("columns", create_or_alter),
    ("constraints", apply_constraints),
    ("indexes", apply_indexes),
    ("record", record),
];

fn bookkeeping_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("id", FieldType::Counter)
            .primary()
            .nullable(false),
        FieldDescriptor::new("appliesTo", FieldType::Text)
            .size(80)
            .nullable(false),
        FieldDescriptor::new("model", FieldType::Text).size(120),
        FieldDescriptor::new("description", FieldType::Text).size(512),
        FieldDescriptor::new("version", FieldType::Text)
            .size(40)
            .nullable(false),
    ]
}

fn validate<'a>(_db: &'a mut H2Adapter, run: &'a mut MigrationRun) -> StageResult<'a> {
    Box::pin(async move {
        let d = &run.descriptor;
        if d.applies_to.trim().is_empty() {
            return Err(AdapterError::SchemaError(
                "migration target (appliesTo) may not be empty".into(),
            ));
        }
        if d.version.trim().is_empty() {
            return Err(AdapterError::SchemaError(format!(
                "migration of {} has no version",
                d.applies_to
            )));
        }
        Ok(StageFlow::Continue)
    })
}

fn ensure_bookkeeping<'a>(db: &'a mut H2Adapter, _run: &'a mut MigrationRun) -> StageResult<'a> {
    Box::pin(async move {
        let mut table = db.table(MIGRATIONS_TABLE);
        if !table.exists().await? {
            tracing::debug!("creating migrations table");
            table.create(&bookkeeping_fields()).await?;
        }
        Ok(StageFlow::Continue)
    })
}

fn check_applied<'a>(db: &'a mut H2Adapter, run: &'a mut MigrationRun) -> StageResult<'a> {
    Box::pin(async move {
        let params = [
            SqlValue::from(run.descriptor.applies_to.as_str()),
            SqlValue::from(run.descriptor.version.as_str()),
        ];
        let rows = db.query(MIGRATION_APPLIED, &params).await?;
        if rows.scalar_int("count").unwrap_or(0) > 0 {
            run.descriptor.updated = true;
            return Ok(StageFlow::Finish(MigrationOutcome::AlreadyApplied));
        }
        Ok(StageFlow::Continue)
    })
}

fn inspect_target<'a>(db: &'a mut H2Adapter, run: &'a mut MigrationRun) -> StageResult<'a> {
    Box::pin(async move {
        run.target_exists = db.table(run.descriptor.applies_to.as_str()).exists().await?;
        Ok(StageFlow::Continue)
    })
}

fn create_or_alter<'a>(db: &'a mut H2Adapter, run: &'a mut MigrationRun) -> StageResult<'a> {
    Box::pin(async move {
        let d = &run.descriptor;
        if run.target_exists {
            let (add, alter) = column_diff(db, d).await?;
            tracing::debug!(
                table = %d.applies_to,
                add = add.len(),
                alter = alter.len(),
                "altering table"
            );
            let mut table = db.table(d.applies_to.as_str());
            table.add(&add).await?;
            table.change(&alter).await?;
            run.outcome = Some(MigrationOutcome::Altered);
        } else {
            if d.add.iter().all(|f| f.one_to_many) {
                return Err(AdapterError::SchemaError(format!(
                    "migration of {} creates a table without columns",
                    d.applies_to
                )));
            }
            db.table(d.applies_to.as_str()).create(&d.add).await?;
            run.outcome = Some(MigrationOutcome::Created);
        }
        Ok(StageFlow::Continue)
    })
}

/// Split the requested fields of an existing table into columns to add and columns whose
/// catalog type drifted. Existing primary-key columns are never altered.
async fn column_diff(
    db: &mut H2Adapter,
    d: &MigrationDescriptor,
) -> Result<(Vec<FieldDescriptor>, Vec<FieldDescriptor>), AdapterError> {
    if !d.remove.is_empty() {
        return Err(AdapterError::UnsupportedOperation(format!(
            "removing columns from {} is not supported",
            d.applies_to
        )));
    }
    if !d.change.is_empty() {
        return Err(AdapterError::UnsupportedOperation(format!(
            "changing columns of {} is not supported",
            d.applies_to
        )));
    }
    let columns = db.table(d.applies_to.as_str()).columns().await?;
    let mut add = Vec::new();
    let mut alter = Vec::new();
    for field in d.add.iter().filter(|f| !f.one_to_many) {
        match columns.iter().find(|c| c.name == field.name) {
            None => add.push(field.clone()),
            Some(column) if column.primary => {}
            Some(column) if column.rendered_type != catalog_type(field) => {
                alter.push(field.clone());
            }
            Some(_) => {}
        }
    }
    Ok((add, alter))
}

fn apply_constraints<'a>(db: &'a mut H2Adapter, run: &'a mut MigrationRun) -> StageResult<'a> {
    Box::pin(async move {
        let d = &run.descriptor;
        let mut keys = db.foreign_keys(d.applies_to.as_str());
        for constraint in d.constraints.iter().filter(|c| c.is_foreign_key()) {
            keys.create(
                &constraint.foreign_key_field,
                &constraint.primary_key_table,
                &constraint.primary_key_field,
            )
            .await?;
        }
        Ok(StageFlow::Continue)
    })
}

fn apply_indexes<'a>(db: &'a mut H2Adapter, run: &'a mut MigrationRun) -> StageResult<'a> {
    Box::pin(async move {
        let d = &run.descriptor;
        let mut indexes = db.indexes(d.applies_to.as_str());
        for index in &d.indexes {
            indexes.create(&index.name, &index.columns).await?;
        }
        Ok(StageFlow::Continue)
    })
}

fn record<'a>(db: &'a mut H2Adapter, run: &'a mut MigrationRun) -> StageResult<'a> {
    Box::pin(async move {
        let d = &run.descriptor;
        let params = [
            SqlValue::from(d.applies_to.as_str()),
            SqlValue::from(d.model.clone()),
            SqlValue::from(d.version.as_str()),
            SqlValue::from(d.description.clone()),
        ];
        db.execute_update(RECORD_MIGRATION, &params).await?;
        let outcome = run.outcome.unwrap_or(MigrationOutcome::Altered);
        tracing::info!(
            table = %d.applies_to,
            version = %d.version,
            outcome = ?outcome,
            "migration applied"
        );
        Ok(StageFlow::Finish(outcome))
    })
}
