use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use h2_middleware::prelude::*;
use h2_middleware::test_utils::MemoryConnector;

const CREATE_PET: &str =
    r#"CREATE TABLE "pet" ("id" INT AUTO_INCREMENT NOT NULL, "name" VARCHAR(50) NULL, PRIMARY KEY ("id"))"#;
const INSERT_PET: &str = r#"INSERT INTO "pet"("name") VALUES (?)"#;

async fn setup(path: &str) -> Result<(MemoryConnector, H2Adapter), AdapterError> {
    let memory = MemoryConnector::new();
    let registry = PoolRegistry::shared(memory.clone());
    let mut db = AdapterOptionsBuilder::path(path).build(registry)?;
    db.execute(CREATE_PET, &[]).await?;
    Ok((memory, db))
}

async fn pet_count(db: &mut H2Adapter) -> Result<i64, AdapterError> {
    let rows = db
        .query(r#"SELECT COUNT(*) AS "cnt" FROM "pet""#, &[])
        .await?;
    Ok(rows.scalar_int("cnt").unwrap_or_default())
}

#[tokio::test]
async fn commit_disables_then_restores_auto_commit() -> Result<(), AdapterError> {
    let (memory, mut db) = setup("mem:tx_commit").await?;

    let inserted = db
        .execute_in_transaction(|db| {
            Box::pin(async move {
                db.execute(INSERT_PET, &[SqlValue::from("Rex")]).await?;
                db.execute(INSERT_PET, &[SqlValue::from("Tom")]).await?;
                assert!(db.transaction_state().is_active());
                Ok(2)
            })
        })
        .await?;

    assert_eq!(inserted, 2);
    assert_eq!(memory.auto_commit_changes(), vec![false, true]);
    assert_eq!(memory.commits(), 1);
    assert_eq!(memory.rollbacks(), 0);
    assert_eq!(db.transaction_state(), TransactionState::Idle);
    assert_eq!(pet_count(&mut db).await?, 2);
    Ok(())
}

#[tokio::test]
async fn error_rolls_back_and_surfaces_unchanged() -> Result<(), AdapterError> {
    let (memory, mut db) = setup("mem:tx_rollback").await?;
    db.execute(INSERT_PET, &[SqlValue::from("Kept")]).await?;

    let err = db
        .execute_in_transaction(|db| {
            Box::pin(async move {
                db.execute(INSERT_PET, &[SqlValue::from("Lost")]).await?;
                db.execute(r#"INSERT INTO "toy"("name") VALUES (?)"#, &[SqlValue::from("ball")])
                    .await?;
                Ok(())
            })
        })
        .await
        .unwrap_err();

    match err {
        AdapterError::Driver(e) => assert!(e.message.contains("toy"), "{e}"),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(memory.rollbacks(), 1);
    assert_eq!(memory.commits(), 0);
    assert_eq!(memory.auto_commit_changes(), vec![false, true]);
    assert_eq!(pet_count(&mut db).await?, 1);
    Ok(())
}

#[tokio::test]
async fn nested_calls_join_the_outer_transaction() -> Result<(), AdapterError> {
    let (memory, mut db) = setup("mem:tx_nested").await?;

    db.execute_in_transaction(|db| {
        Box::pin(async move {
            db.execute(INSERT_PET, &[SqlValue::from("outer")]).await?;
            db.execute_in_transaction(|db| {
                Box::pin(async move {
                    db.execute(INSERT_PET, &[SqlValue::from("inner")]).await?;
                    Ok(())
                })
            })
            .await
        })
    })
    .await?;

    assert_eq!(memory.auto_commit_changes(), vec![false, true]);
    assert_eq!(memory.commits(), 1);
    assert_eq!(pet_count(&mut db).await?, 2);
    Ok(())
}

#[tokio::test]
async fn inner_failure_rolls_back_the_outer_work() -> Result<(), AdapterError> {
    let (memory, mut db) = setup("mem:tx_inner_fail").await?;

    let err = db
        .execute_in_transaction(|db| {
            Box::pin(async move {
                db.execute(INSERT_PET, &[SqlValue::from("outer")]).await?;
                db.execute_in_transaction(|db| {
                    Box::pin(async move {
                        db.execute("", &[]).await?;
                        Ok(())
                    })
                })
                .await
            })
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AdapterError::FormatError(_)));
    assert_eq!(memory.rollbacks(), 1);
    assert_eq!(memory.commits(), 0);
    assert_eq!(pet_count(&mut db).await?, 0);
    Ok(())
}

#[tokio::test]
async fn failed_rollback_does_not_mask_the_error() -> Result<(), AdapterError> {
    let (memory, mut db) = setup("mem:tx_rollback_fails").await?;
    memory.fail_rollback(true);

    let err = db
        .execute_in_transaction(|db| {
            Box::pin(async move {
                db.execute(r#"SELECT * FROM "nowhere""#, &[]).await?;
                Ok(())
            })
        })
        .await
        .unwrap_err();

    match err {
        AdapterError::Driver(e) => assert_eq!(e.code, Some(42102)),
        other => panic!("unexpected error {other:?}"),
    }
    // auto-commit is restored even though the rollback failed
    assert_eq!(memory.auto_commit_changes(), vec![false, true]);
    assert_eq!(db.transaction_state(), TransactionState::Idle);
    Ok(())
}

#[tokio::test]
async fn commit_failure_is_reported() -> Result<(), AdapterError> {
    let (memory, mut db) = setup("mem:tx_commit_fails").await?;
    memory.fail_commit(true);

    let err = db
        .execute_in_transaction(|db| {
            Box::pin(async move {
                db.execute(INSERT_PET, &[SqlValue::from("Rex")]).await?;
                Ok(())
            })
        })
        .await
        .unwrap_err();

    match err {
        AdapterError::Driver(e) => assert!(e.message.contains("commit failed")),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(memory.auto_commit_changes(), vec![false, true]);
    Ok(())
}

#[tokio::test]
async fn panic_inside_transaction_rolls_back() -> Result<(), AdapterError> {
    let memory = MemoryConnector::new();
    let registry = PoolRegistry::shared(memory.clone());
    let mut setup = AdapterOptionsBuilder::path("mem:tx_panic").build(Arc::clone(&registry))?;
    setup.execute(CREATE_PET, &[]).await?;
    setup.close().await?;

    let handle = tokio::spawn({
        let registry = Arc::clone(&registry);
        async move {
            let mut db = AdapterOptionsBuilder::path("mem:tx_panic").build(registry)?;
            db.execute_in_transaction(|db| {
                Box::pin(async move {
                    db.execute(INSERT_PET, &[SqlValue::from("doomed")]).await?;
                    if true {
                        panic!("boom");
                    }
                    Ok(())
                })
            })
            .await
        }
    });

    let joined = handle.await;
    assert!(joined.is_err_and(|e| e.is_panic()));
    assert_eq!(memory.rollbacks(), 1);
    assert_eq!(memory.commits(), 0);
    assert!(memory.rows("pet").is_empty());
    Ok(())
}

#[tokio::test]
async fn panic_before_the_body_runs_still_rolls_back() -> Result<(), AdapterError> {
    let (memory, mut db) = setup("mem:tx_sync_panic").await?;

    let caught = AssertUnwindSafe(
        db.execute_in_transaction::<(), _>(|_db| panic!("closure gave up early")),
    )
    .catch_unwind()
    .await;
    assert!(caught.is_err());

    assert_eq!(db.transaction_state(), TransactionState::Idle);
    assert_eq!(memory.rollbacks(), 1);
    assert_eq!(memory.auto_commit_changes(), vec![false, true]);

    db.execute_in_transaction(|db| {
        Box::pin(async move {
            db.execute(INSERT_PET, &[SqlValue::from("Rex")]).await?;
            Ok(())
        })
    })
    .await?;
    assert_eq!(memory.commits(), 1);
    assert_eq!(memory.auto_commit_changes(), vec![false, true, false, true]);
    assert_eq!(pet_count(&mut db).await?, 1);
    Ok(())
}

#[tokio::test]
async fn close_and_reopen_keep_auto_commit_untouched() -> Result<(), AdapterError> {
    let (memory, mut db) = setup("mem:tx_close").await?;
    db.close().await?;
    assert!(!db.is_open());
    db.execute(INSERT_PET, &[SqlValue::from("Rex")]).await?;
    assert!(db.is_open());
    assert!(memory.auto_commit_changes().is_empty());
    assert_eq!(memory.rollbacks(), 0);
    Ok(())
}
