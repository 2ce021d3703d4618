use std::panic::{AssertUnwindSafe, resume_unwind};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use super::H2Adapter;
use crate::error::AdapterError;

/// Whether an adapter is inside an explicit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    #[default]
    Idle,
    Active,
}

impl TransactionState {
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, TransactionState::Active)
    }
}

impl H2Adapter {
    /// Run `f` inside a transaction.
    ///
    /// Only the outermost call owns the commit boundary: it turns auto-commit off, runs
    /// `f`, then commits on success or rolls back on error (or panic) and restores
    /// auto-commit. Calls made while a transaction is already active simply run `f`.
    ///
    /// ```rust,no_run
    /// # use h2_middleware::prelude::*;
    /// # async fn demo(db: &mut H2Adapter) -> Result<(), AdapterError> {
    /// db.execute_in_transaction(|db| {
    ///     Box::pin(async move {
    ///         db.execute(r#"UPDATE "pet" SET "age"="age"+1"#, &[]).await?;
    ///         db.execute(r#"DELETE FROM "pet" WHERE "age">?"#, &[SqlValue::Int(30)]).await?;
    ///         Ok(())
    ///     })
    /// })
    /// .await
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns the error produced by `f` (rollback failures are only logged), or the
    /// commit error. Connection errors from [`open`](H2Adapter::open) are returned before
    /// `f` runs.
    pub async fn execute_in_transaction<T, F>(&mut self, f: F) -> Result<T, AdapterError>
    where
        F: for<'a> FnOnce(&'a mut H2Adapter) -> BoxFuture<'a, Result<T, AdapterError>> + Send,
        T: Send,
    {
        self.open().await?;
        if self.transaction.is_active() {
            return f(self).await;
        }

        self.set_auto_commit(false).await?;
        self.transaction = TransactionState::Active;
        tracing::debug!(db = %self.settings.target, "transaction started");

        // calling `f` happens inside the guarded future so synchronous panics are caught too
        let this = &mut *self;
        let outcome = AssertUnwindSafe(async move { f(this).await })
            .catch_unwind()
            .await;
        self.transaction = TransactionState::Idle;

        match outcome {
            Ok(Ok(value)) => {
                let committed = self.finish(true).await;
                committed.map(|()| value)
            }
            Ok(Err(err)) => {
                if let Err(rollback_err) = self.finish(false).await {
                    tracing::warn!(error = %rollback_err, "rollback failed; reporting the original error");
                }
                Err(err)
            }
            Err(panic) => {
                if let Err(rollback_err) = self.finish(false).await {
                    tracing::warn!(error = %rollback_err, "rollback after panic failed");
                }
                resume_unwind(panic)
            }
        }
    }

    /// Commit or roll back, then restore auto-commit even if the first step failed.
    async fn finish(&mut self, commit: bool) -> Result<(), AdapterError> {
        let conn = self.reserved().await?;
        let ended = if commit {
            conn.commit().await
        } else {
            conn.rollback().await
        };
        let restored = conn.set_auto_commit(true).await;
        tracing::debug!(
            db = %self.settings.target,
            committed = commit && ended.is_ok(),
            "transaction finished"
        );
        ended?;
        restored?;
        Ok(())
    }

    async fn set_auto_commit(&mut self, enabled: bool) -> Result<(), AdapterError> {
        let conn = self.reserved().await?;
        conn.set_auto_commit(enabled).await?;
        Ok(())
    }
}
