use std::sync::Arc;

use h2_middleware::prelude::*;
use h2_middleware::test_utils::MemoryConnector;

fn adapter(registry: &Arc<PoolRegistry>, path: &str) -> Result<H2Adapter, AdapterError> {
    AdapterOptionsBuilder::path(path)
        .pool_size(4)
        .build(Arc::clone(registry))
}

#[tokio::test]
async fn open_is_idempotent_and_close_releases() -> Result<(), AdapterError> {
    let registry = PoolRegistry::shared(MemoryConnector::new());
    let mut db = adapter(&registry, "mem:pool_a")?;

    assert!(!db.is_open());
    db.open().await?;
    db.open().await?;
    assert!(db.is_open());
    assert_eq!(registry.pool_count().await, 1);

    db.close().await?;
    assert!(!db.is_open());
    // closing twice is a no-op
    db.close().await?;
    Ok(())
}

#[tokio::test]
async fn one_pool_per_target() -> Result<(), AdapterError> {
    let registry = PoolRegistry::shared(MemoryConnector::new());
    let mut first = adapter(&registry, "mem:shared")?;
    let mut second = adapter(&registry, "mem:shared")?;
    let mut other = adapter(&registry, "mem:other")?;

    first.open().await?;
    second.open().await?;
    assert_eq!(registry.pool_count().await, 1);

    other.open().await?;
    assert_eq!(registry.pool_count().await, 2);

    let state = registry
        .state(&first.settings().target)
        .await
        .expect("pool registered for target");
    assert!(state.connections >= 2);
    assert!(state.connections <= 4);

    registry.shutdown().await;
    assert_eq!(registry.pool_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn concurrent_adapters_reserve_independently() -> Result<(), AdapterError> {
    let memory = MemoryConnector::new();
    let registry = PoolRegistry::shared(memory.clone());
    let mut setup = adapter(&registry, "mem:concurrent")?;
    setup
        .execute(r#"CREATE TABLE "hit" ("n" INTEGER NOT NULL)"#, &[])
        .await?;
    setup.close().await?;

    let mut tasks = Vec::new();
    for n in 0..4 {
        let registry = Arc::clone(&registry);
        tasks.push(tokio::spawn(async move {
            let mut db = adapter(&registry, "mem:concurrent")?;
            db.execute(r#"INSERT INTO "hit"("n") VALUES (?)"#, &[SqlValue::Int(n)])
                .await?;
            db.close().await?;
            Ok::<(), AdapterError>(())
        }));
    }
    for task in tasks {
        task.await.expect("task completes")?;
    }
    assert_eq!(registry.pool_count().await, 1);
    assert_eq!(memory.rows("hit").len(), 4);
    Ok(())
}

#[tokio::test]
async fn missing_target_is_config_error() {
    let registry = PoolRegistry::shared(MemoryConnector::new());
    let err = H2Adapter::new(AdapterOptions::default(), registry).unwrap_err();
    assert!(matches!(err, AdapterError::ConfigError(_)));
}

#[tokio::test]
async fn failed_pool_initialization_is_not_registered() -> Result<(), AdapterError> {
    let memory = MemoryConnector::new();
    let registry = PoolRegistry::shared(memory.clone());
    let mut db = adapter(&registry, "mem:flaky")?;

    memory.fail_connect(true);
    let err = db.open().await.unwrap_err();
    assert!(matches!(err, AdapterError::ConnectionError(_)), "{err}");
    assert!(!db.is_open());
    assert_eq!(registry.pool_count().await, 0);

    memory.fail_connect(false);
    db.open().await?;
    assert_eq!(registry.pool_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn execute_routes_by_statement_kind() -> Result<(), AdapterError> {
    let memory = MemoryConnector::new();
    let registry = PoolRegistry::shared(memory.clone());
    let mut db = adapter(&registry, "mem:routing")?;

    let created = db
        .execute(
            r#"CREATE TABLE "pet" ("id" INT AUTO_INCREMENT NOT NULL, "name" VARCHAR(50) NULL, PRIMARY KEY ("id"))"#,
            &[],
        )
        .await?;
    assert!(matches!(created, ExecuteResult::Affected(0)));

    let inserted = db
        .execute(
            QueryExpression::insert("pet", [("name", Expr::value("O'Brien"))]),
            &[],
        )
        .await?;
    assert_eq!(inserted.affected(), 1);
    assert!(
        memory
            .statements()
            .iter()
            .any(|s| s == r#"INSERT INTO "pet"("name") VALUES ('O''Brien')"#)
    );

    let rows = db
        .execute(
            "select * from \"pet\" where \"name\"=?",
            &[SqlValue::from("O'Brien")],
        )
        .await?
        .into_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.results[0].int("id"), Some(1));

    let by_expression = db
        .execute(
            QueryExpression::select("pet")
                .field(Expr::field("name"))
                .filter(Expr::field("id").eq(SqlValue::Int(1)))
                .build(),
            &[],
        )
        .await?
        .into_rows();
    assert_eq!(by_expression.results[0].text("name").as_deref(), Some("O'Brien"));

    assert_eq!(db.last_identity().await?, Some(1));
    assert_eq!(db.database_timezone().await?, "+00:00");
    Ok(())
}

#[tokio::test]
async fn empty_sql_and_batches_are_rejected() -> Result<(), AdapterError> {
    let registry = PoolRegistry::shared(MemoryConnector::new());
    let mut db = adapter(&registry, "mem:rejects")?;

    let err = db.execute("   ", &[]).await.unwrap_err();
    assert!(matches!(err, AdapterError::FormatError(_)));
    // nothing was reserved for a statement that never ran
    assert!(!db.is_open());

    let err = db
        .execute_batch(&[Statement::from("SELECT 1")])
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::Unimplemented(_)));
    Ok(())
}

#[tokio::test]
async fn driver_errors_pass_through() -> Result<(), AdapterError> {
    let registry = PoolRegistry::shared(MemoryConnector::new());
    let mut db = adapter(&registry, "mem:errors")?;

    let err = db.execute(r#"SELECT * FROM "missing""#, &[]).await.unwrap_err();
    match err {
        AdapterError::Driver(e) => {
            assert_eq!(e.code, Some(42102));
            assert!(e.message.contains("missing"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(db.last_identity().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn statement_logging_does_not_change_results() -> Result<(), AdapterError> {
    let registry = PoolRegistry::shared(MemoryConnector::new());
    let mut db = AdapterOptionsBuilder::path("mem:logged")
        .statement_logging(true)
        .build(registry)?;
    assert!(db.options().statement_logging);

    db.execute(r#"CREATE TABLE "t" ("a" INTEGER NULL)"#, &[]).await?;
    db.execute(r#"INSERT INTO "t"("a") VALUES (?)"#, &[SqlValue::Int(5)])
        .await?;
    let rows = db.query(r#"SELECT "a" FROM "t""#, &[]).await?;
    assert_eq!(rows.scalar_int("a"), Some(5));
    Ok(())
}
