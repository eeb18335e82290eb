//! Shared helpers for the store lifecycle tests

use portal_db::database::queries::Queries;
use portal_db::database::schema::Table;
use portal_db::lifecycle::SeedReport;
use portal_db::{ConnectionManager, Migrator, Seeder};

/// Fixed seed so attendance and vote outcomes are stable across runs.
pub const TEST_RNG_SEED: u64 = 2025;

/// Setup an in-memory SQLite store with the schema applied
pub async fn setup_test_db() -> ConnectionManager {
    let manager = ConnectionManager::in_memory().expect("Failed to create test store");
    Migrator::new()
        .apply_schema(&manager)
        .await
        .expect("Failed to apply schema");
    manager
}

/// Setup a migrated store holding the sample dataset
pub async fn setup_seeded_db() -> (ConnectionManager, SeedReport) {
    let manager = setup_test_db().await;
    let report = Seeder::from_seed(TEST_RNG_SEED)
        .populate_sample(&manager)
        .await
        .expect("Failed to seed test store");
    (manager, report)
}

/// Row count of one table. The connection goes back to the pool before
/// returning; the in-memory store only has one.
pub async fn row_count(manager: &ConnectionManager, table: Table) -> i64 {
    let mut conn = manager.acquire().await.expect("Failed to acquire connection");
    let count = Queries::count(&mut conn, table).await.expect("Failed to count rows");
    manager.release(conn);
    count
}

/// Tables and indexes present in the store, sorted.
pub async fn store_objects(manager: &ConnectionManager) -> Vec<(String, String)> {
    let mut conn = manager.acquire().await.expect("Failed to acquire connection");
    let objects = Queries::list_objects(&mut conn, manager.dialect())
        .await
        .expect("Failed to list store objects");
    manager.release(conn);
    objects
}
