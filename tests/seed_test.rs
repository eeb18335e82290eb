//! Sample data tests

use portal_db::database::models::EntityType;
use portal_db::database::queries::Queries;
use portal_db::database::schema::Table;
use portal_db::{ConnectionManager, LifecycleOptions, Migrator, PortalError, SeedConfig, Seeder};

mod common;
use common::*;

#[tokio::test]
async fn test_sample_dataset_shape() -> Result<(), Box<dyn std::error::Error>> {
    let (manager, report) = setup_seeded_db().await;

    assert_eq!(report.politicians, 6);
    assert_eq!(report.sessions, 4);
    assert_eq!(report.projects, 4);
    assert_eq!(report.executive_acts, 3);
    assert_eq!(report.attendance, 10);
    assert_eq!(report.votes, 10);
    assert_eq!(report.sources, 13);
    assert_eq!(report.summaries, 4);

    for table in Table::ALL {
        assert_eq!(
            row_count(&manager, table).await,
            report.count(table) as i64,
            "row count mismatch in {}",
            table
        );
    }
    println!("✅ Sample dataset has the expected shape");

    Ok(())
}

#[tokio::test]
async fn test_sources_cover_every_seeded_entity() -> Result<(), Box<dyn std::error::Error>> {
    let (manager, _) = setup_seeded_db().await;
    let mut conn = manager.acquire().await?;

    let expected = [
        (EntityType::Politician, 6),
        (EntityType::Project, 4),
        (EntityType::ExecutiveAct, 3),
        (EntityType::LegislativeSession, 0),
    ];
    for (entity_type, count) in expected {
        let found = Queries::count_where(
            &mut conn,
            manager.dialect(),
            Table::Sources,
            "entity_type",
            entity_type.as_str(),
        )
        .await?;
        assert_eq!(found, count, "sources for {}", entity_type);
    }

    let gazette = Queries::count_where(
        &mut conn,
        manager.dialect(),
        Table::Sources,
        "source_name",
        "Diário Oficial de Santos",
    )
    .await?;
    assert_eq!(gazette, 3);
    manager.release(conn);

    Ok(())
}

#[tokio::test]
async fn test_seeded_pairs_are_unique_and_resolved() -> Result<(), Box<dyn std::error::Error>> {
    let (manager, _) = setup_seeded_db().await;
    let mut conn = manager.acquire().await?;

    let keys: [(Table, &[&str]); 3] = [
        (Table::Attendance, &["politician_id", "session_id"]),
        (Table::Votes, &["project_id", "politician_id"]),
        (Table::Projects, &["author_id"]),
    ];
    for (table, columns) in keys {
        let duplicates = Queries::duplicate_keys(&mut conn, table, columns).await?;
        assert_eq!(duplicates, 0, "duplicate {:?} in {}", columns, table);
    }

    for (table, column) in [
        (Table::Attendance, "politician_id"),
        (Table::Attendance, "session_id"),
        (Table::Projects, "author_id"),
        (Table::Votes, "project_id"),
        (Table::Votes, "politician_id"),
        (Table::ExecutiveActs, "author_id"),
        (Table::Summaries, "reviewed_by"),
    ] {
        assert_eq!(
            Queries::orphaned_rows(&mut conn, table, column).await?,
            0,
            "orphans in {}.{}",
            table,
            column
        );
    }
    manager.release(conn);
    println!("✅ No duplicate pairs and no dangling references");

    Ok(())
}

#[tokio::test]
async fn test_only_first_summary_is_reviewed() -> Result<(), Box<dyn std::error::Error>> {
    let (manager, _) = setup_seeded_db().await;
    let mut conn = manager.acquire().await?;

    let reviewed: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM summaries \
         WHERE is_reviewed AND reviewed_at IS NOT NULL AND reviewed_by IS NOT NULL",
    )
    .fetch_one(&mut *conn)
    .await?;
    assert_eq!(reviewed, 1);

    let mayor_acts: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM executive_acts a \
         JOIN politicians p ON p.id = a.author_id WHERE p.position = 'mayor'",
    )
    .fetch_one(&mut *conn)
    .await?;
    assert_eq!(mayor_acts, 3);
    manager.release(conn);

    Ok(())
}

#[tokio::test]
async fn test_reseed_without_reset_hits_unique_keys() {
    let (manager, _) = setup_seeded_db().await;

    let err = Seeder::from_seed(TEST_RNG_SEED)
        .populate_sample(&manager)
        .await
        .unwrap_err();
    assert!(err.is_duplicate_key(), "got {:?}", err);
    println!("✅ Second seed rejected with {}", err);
}

#[tokio::test]
async fn test_atomic_seed_rolls_back_on_duplicate() {
    let (manager, _) = setup_seeded_db().await;

    let err = Seeder::from_seed(TEST_RNG_SEED)
        .with_options(LifecycleOptions { atomic: true })
        .populate_sample(&manager)
        .await
        .unwrap_err();
    assert!(err.is_duplicate_key());

    // Politicians have no unique key, so a non-atomic retry would have added six more.
    assert_eq!(row_count(&manager, Table::Politicians).await, 6);
}

#[tokio::test]
async fn test_seed_without_schema_fails() {
    let manager = ConnectionManager::in_memory().unwrap();
    let err = Seeder::from_seed(1).populate_sample(&manager).await.unwrap_err();
    assert!(
        matches!(err, PortalError::SeedFailed { batch: Table::Politicians, .. }),
        "got {:?}",
        err
    );
}

#[tokio::test]
async fn test_custom_seed_config() -> Result<(), Box<dyn std::error::Error>> {
    let manager = ConnectionManager::in_memory()?;
    Migrator::new().apply_schema(&manager).await?;

    let config = SeedConfig {
        attendance_politicians: 6,
        attendance_sessions: 4,
        vote_projects: 4,
        vote_politicians: 6,
        present_probability: 1.0,
        yes_probability: 0.0,
    };
    let report = Seeder::from_seed(9).with_config(config).populate_sample(&manager).await?;
    assert_eq!(report.attendance, 24);
    assert_eq!(report.votes, 24);

    let mut conn = manager.acquire().await?;
    let dialect = manager.dialect();
    let present =
        Queries::count_where(&mut conn, dialect, Table::Attendance, "status", "present").await?;
    let yes = Queries::count_where(&mut conn, dialect, Table::Votes, "vote", "yes").await?;
    manager.release(conn);
    assert_eq!(present, 24);
    assert_eq!(yes, 0);

    Ok(())
}

#[tokio::test]
async fn test_invalid_probability_is_rejected_before_connecting() {
    let manager = ConnectionManager::in_memory().unwrap();
    let config = SeedConfig {
        yes_probability: -0.1,
        ..SeedConfig::default()
    };
    let err = Seeder::from_seed(3)
        .with_config(config)
        .populate_sample(&manager)
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Config(_)));
}

#[tokio::test]
async fn test_on_disk_store_persists_sample() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("portal.db").display());

    let manager = ConnectionManager::connect_url(&url)?;
    Migrator::new().apply_schema(&manager).await?;
    Seeder::from_seed(TEST_RNG_SEED).populate_sample(&manager).await?;
    manager.shutdown().await;
    assert!(manager.is_closed());

    let reopened = ConnectionManager::connect_url(&url)?;
    assert_eq!(row_count(&reopened, Table::Politicians).await, 6);
    assert_eq!(row_count(&reopened, Table::Votes).await, 10);
    reopened.shutdown().await;

    Ok(())
}
