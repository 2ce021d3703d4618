use super::H2Adapter;
use crate::error::AdapterError;
use crate::model::{FieldDescriptor, MigrationDescriptor};
use crate::query::{Expr, QueryExpression};
use crate::types::{FieldType, SqlValue};

const INCREMENTS_TABLE: &str = "increment_id";

fn increments_migration() -> MigrationDescriptor {
    MigrationDescriptor::new(INCREMENTS_TABLE, "1.0")
        .model("increments")
        .description("Increments migration (version 1.0)")
        .add(FieldDescriptor::new("id", FieldType::Counter).primary())
        .add(FieldDescriptor::new("entity", FieldType::Text).size(120))
        .add(FieldDescriptor::new("attribute", FieldType::Text).size(120))
        .add(FieldDescriptor::new("value", FieldType::Integer))
}

impl H2Adapter {
    /// Next value of a generated key kept in the `increment_id` table.
    ///
    /// The first request for an `(entity, attribute)` pair starts after the largest value
    /// already stored in that column (or at 1); later requests count up from there.
    ///
    /// # Errors
    /// Migration, connection and driver errors; `SchemaError` for an unreadable counter row.
    pub async fn select_identity(&mut self, entity: &str, attribute: &str) -> Result<i64, AdapterError> {
        let mut migration = increments_migration();
        self.migrate(&mut migration).await?;

        let key = [SqlValue::from(entity), SqlValue::from(attribute)];
        let existing = self
            .query(
                r#"SELECT * FROM "increment_id" WHERE "entity"=? AND "attribute"=?"#,
                &key,
            )
            .await?;

        if let Some(row) = existing.first() {
            let (Some(id), Some(current)) = (row.int("id"), row.int("value")) else {
                return Err(AdapterError::SchemaError(format!(
                    "unreadable increment row for {entity}.{attribute}"
                )));
            };
            let value = current + 1;
            self.execute_update(
                r#"UPDATE "increment_id" SET "value"=? WHERE "id"=?"#,
                &[SqlValue::Int(value), SqlValue::Int(id)],
            )
            .await?;
            return Ok(value);
        }

        let seed = QueryExpression::select(entity)
            .field_as(Expr::func("max", [Expr::field(attribute)]), attribute)
            .build();
        let max = self.execute(seed, &[]).await?.into_rows();
        let value = max.scalar_int(attribute).map_or(1, |n| n + 1);
        let [entity, attribute] = key;
        self.execute_update(
            r#"INSERT INTO "increment_id"("entity", "attribute", "value") VALUES (?,?,?)"#,
            &[entity, attribute, SqlValue::Int(value)],
        )
        .await?;
        Ok(value)
    }

    /// Identity generated by the last insert on this connection, if the driver reports one.
    ///
    /// # Errors
    /// Only connection errors; a failing probe yields `Ok(None)`.
    pub async fn last_identity(&mut self) -> Result<Option<i64>, AdapterError> {
        self.open().await?;
        match self.query(r#"SELECT SCOPE_IDENTITY() as "lastval""#, &[]).await {
            Ok(rows) => Ok(rows.scalar_int("lastval")),
            Err(e) => {
                tracing::debug!(error = %e, "SCOPE_IDENTITY() probe failed");
                Ok(None)
            }
        }
    }
}
