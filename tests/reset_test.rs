//! Reset tests

use portal_db::database::queries::Queries;
use portal_db::database::schema::{Table, DROP_ORDER};
use portal_db::{ConnectionManager, LifecycleOptions, Migrator, PortalError, Resetter, Seeder};

mod common;
use common::*;

#[tokio::test]
async fn test_reset_drops_seeded_store() -> Result<(), Box<dyn std::error::Error>> {
    let (manager, _) = setup_seeded_db().await;

    // Dependents go first, so foreign keys never block a drop.
    let report = Resetter::new().reset_all(&manager).await?;
    assert_eq!(report.tables, DROP_ORDER.to_vec());
    assert_eq!(report.tables.last(), Some(&Table::Politicians));

    let objects = store_objects(&manager).await;
    assert!(objects.is_empty(), "left behind: {:?}", objects);
    println!("✅ Seeded store reset to empty");

    Ok(())
}

#[tokio::test]
async fn test_reset_on_empty_store() -> Result<(), Box<dyn std::error::Error>> {
    let manager = ConnectionManager::in_memory()?;
    let first = Resetter::new().reset_all(&manager).await?;
    let second = Resetter::new().reset_all(&manager).await?;
    assert_eq!(first.tables.len(), 8);
    assert_eq!(second.tables.len(), 8);

    Ok(())
}

#[tokio::test]
async fn test_full_lifecycle_twice() -> Result<(), Box<dyn std::error::Error>> {
    let manager = ConnectionManager::in_memory()?;

    for round in 0..2 {
        Resetter::new().reset_all(&manager).await?;
        Migrator::new().apply_schema(&manager).await?;
        let report = Seeder::from_seed(TEST_RNG_SEED + round).populate_sample(&manager).await?;
        assert_eq!(row_count(&manager, Table::Politicians).await, 6);
        assert_eq!(row_count(&manager, Table::Sources).await, report.sources as i64);
    }
    println!("✅ reset → migrate → seed repeats cleanly");

    Ok(())
}

#[tokio::test]
async fn test_atomic_reset() -> Result<(), Box<dyn std::error::Error>> {
    let (manager, _) = setup_seeded_db().await;
    Resetter::with_options(LifecycleOptions { atomic: true })
        .reset_all(&manager)
        .await?;
    assert!(store_objects(&manager).await.is_empty());

    Migrator::new().apply_schema(&manager).await?;
    assert_eq!(row_count(&manager, Table::Summaries).await, 0);

    Ok(())
}

#[tokio::test]
async fn test_failed_drop_stops_the_sequence() -> Result<(), Box<dyn std::error::Error>> {
    let (manager, _) = setup_seeded_db().await;

    // A view under a catalog table name cannot be removed with DROP TABLE.
    let mut conn = manager.acquire().await?;
    sqlx::query("DROP TABLE votes").execute(&mut *conn).await?;
    sqlx::query("CREATE VIEW votes AS SELECT 1 AS id")
        .execute(&mut *conn)
        .await?;
    manager.release(conn);

    let err = Resetter::new().reset_all(&manager).await.unwrap_err();
    assert!(
        matches!(err, PortalError::ResetFailed { table: Table::Votes, .. }),
        "got {:?}",
        err
    );
    assert_eq!(err.to_string(), "Failed to drop table votes");

    let mut conn = manager.acquire().await?;
    let counts = Queries::table_counts(&mut conn, manager.dialect()).await?;
    manager.release(conn);
    let rows = |table: Table| {
        counts
            .iter()
            .find(|(t, _)| *t == table)
            .and_then(|(_, rows)| *rows)
    };

    // Dropped before the failure and not restored...
    assert_eq!(rows(Table::Summaries), None);
    assert_eq!(rows(Table::Sources), None);
    // ...everything after it untouched.
    assert_eq!(rows(Table::ExecutiveActs), Some(3));
    assert_eq!(rows(Table::Projects), Some(4));
    assert_eq!(rows(Table::Politicians), Some(6));
    println!("✅ Reset stopped at votes and kept the remaining tables");

    Ok(())
}
