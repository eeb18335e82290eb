//! Schema application tests

use portal_db::database::queries::Queries;
use portal_db::database::schema::{Table, INDEXES, TABLES};
use portal_db::{ConnectionManager, DatabaseConfig, LifecycleOptions, Migrator, PortalError};

mod common;
use common::*;

#[tokio::test]
async fn test_apply_schema_creates_catalog() -> Result<(), Box<dyn std::error::Error>> {
    let manager = ConnectionManager::in_memory()?;
    let report = Migrator::new().apply_schema(&manager).await?;
    assert_eq!(report.tables, 8);
    assert_eq!(report.indexes, 15);
    assert_eq!(report.statements, 23);
    assert!(report.server_version.starts_with("SQLite"));

    let objects = store_objects(&manager).await;
    let tables: Vec<_> = objects.iter().filter(|(kind, _)| kind == "table").collect();
    let indexes: Vec<_> = objects.iter().filter(|(kind, _)| kind == "index").collect();
    assert_eq!(tables.len(), TABLES.len());
    assert_eq!(indexes.len(), INDEXES.len());
    for def in &TABLES {
        assert!(
            tables.iter().any(|(_, name)| name == def.table.name()),
            "missing table {}",
            def.table
        );
    }
    for index in &INDEXES {
        assert!(indexes.iter().any(|(_, name)| name == index.name), "missing index {}", index.name);
    }
    println!("✅ Schema applied with 8 tables and 15 indexes");

    Ok(())
}

#[tokio::test]
async fn test_apply_schema_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let manager = setup_test_db().await;
    let before = store_objects(&manager).await;

    Migrator::new().apply_schema(&manager).await?;
    Migrator::new().apply_schema(&manager).await?;
    assert_eq!(store_objects(&manager).await, before);
    println!("✅ Re-applying the schema changes nothing");

    Ok(())
}

#[tokio::test]
async fn test_apply_schema_keeps_existing_rows() -> Result<(), Box<dyn std::error::Error>> {
    let (manager, report) = setup_seeded_db().await;
    Migrator::new().apply_schema(&manager).await?;

    assert_eq!(
        row_count(&manager, Table::Politicians).await,
        report.politicians as i64
    );

    Ok(())
}

#[tokio::test]
async fn test_atomic_apply_schema() -> Result<(), Box<dyn std::error::Error>> {
    let manager = ConnectionManager::in_memory()?;
    let migrator = Migrator::with_options(LifecycleOptions { atomic: true });
    migrator.apply_schema(&manager).await?;
    migrator.apply_schema(&manager).await?;
    assert_eq!(store_objects(&manager).await.len(), 23);

    Ok(())
}

#[tokio::test]
async fn test_unreachable_store_reports_connectivity() {
    let mut config = DatabaseConfig::from_url("sqlite:///nonexistent/portal/dir/store.db?mode=ro");
    config.pool_min = 0;
    config.connect_timeout_ms = 1_000;
    let manager = ConnectionManager::connect(&config).unwrap();

    let err = Migrator::new().apply_schema(&manager).await.unwrap_err();
    assert!(matches!(err, PortalError::Connectivity(_)), "got {:?}", err);
    assert_eq!(err.kind(), "connectivity");
    println!("✅ Unreachable store reported before any statement ran");
}

#[tokio::test]
async fn test_unsupported_url_is_a_config_error() {
    let err = ConnectionManager::connect_url("mysql://localhost/portal").err().unwrap();
    assert!(matches!(err, PortalError::Config(_)));
}

#[tokio::test]
async fn test_conflicting_object_names_failing_statement(
) -> Result<(), Box<dyn std::error::Error>> {
    let manager = ConnectionManager::in_memory()?;
    let mut conn = manager.acquire().await?;
    sqlx::query("CREATE TABLE politicians (id TEXT PRIMARY KEY)")
        .execute(&mut *conn)
        .await?;
    manager.release(conn);

    let err = Migrator::new().apply_schema(&manager).await.unwrap_err();
    match &err {
        PortalError::SchemaConflict { statement, .. } => assert_eq!(
            statement,
            "CREATE INDEX IF NOT EXISTS idx_politicians_position ON politicians(position)"
        ),
        other => panic!("expected a schema conflict, got {:?}", other),
    }
    assert_eq!(err.kind(), "schema_conflict");

    // Statements before the failing one stay applied.
    let tables = store_objects(&manager)
        .await
        .into_iter()
        .filter(|(kind, _)| kind == "table")
        .count();
    assert_eq!(tables, TABLES.len());
    println!("✅ Conflict reported as {}", err);

    Ok(())
}

#[tokio::test]
async fn test_table_counts_mark_absent_tables() -> Result<(), Box<dyn std::error::Error>> {
    let manager = ConnectionManager::in_memory()?;

    let mut conn = manager.acquire().await?;
    let before = Queries::table_counts(&mut conn, manager.dialect()).await?;
    manager.release(conn);
    assert_eq!(before.len(), 8);
    assert!(before.iter().all(|(_, rows)| rows.is_none()));

    Migrator::new().apply_schema(&manager).await?;
    let mut conn = manager.acquire().await?;
    let after = Queries::table_counts(&mut conn, manager.dialect()).await?;
    manager.release(conn);
    assert!(after.iter().all(|(_, rows)| *rows == Some(0)));

    Ok(())
}
