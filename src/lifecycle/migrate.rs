use std::time::Duration;

use sqlx::{AnyConnection, Connection};
use tracing::{debug, info};

use super::{run_logged, LifecycleOptions, Operation, OperationReport};
use crate::database::schema::{self, INDEXES, TABLES};
use crate::database::{ConnectionManager, Dialect, ProbeInfo};
use crate::error::PortalError;

#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub tables: usize,
    pub indexes: usize,
    pub statements: usize,
    pub server_version: String,
    pub elapsed: Duration,
}

impl OperationReport for MigrationReport {
    fn items(&self) -> usize {
        self.statements
    }

    fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }
}

/// Applies the schema catalog. Every statement is `IF NOT EXISTS`, so
/// running it against an up-to-date store changes nothing.
#[derive(Debug, Clone, Default)]
pub struct Migrator {
    options: LifecycleOptions,
}

impl Migrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: LifecycleOptions) -> Self {
        Self { options }
    }

    pub async fn apply_schema(
        &self,
        manager: &ConnectionManager,
    ) -> Result<MigrationReport, PortalError> {
        run_logged(Operation::Migrate, self.options.atomic, async {
            let mut conn = manager.acquire().await?;
            let result = self.apply_on(manager, &mut conn).await;
            manager.release(conn);
            result
        })
        .await
    }

    async fn apply_on(
        &self,
        manager: &ConnectionManager,
        conn: &mut AnyConnection,
    ) -> Result<MigrationReport, PortalError> {
        // Nothing is executed unless the store answers first.
        let ProbeInfo { server_version, .. } = manager.probe(conn).await?;
        let dialect = manager.dialect();

        info!("Applying schema ({} tables, {} indexes)", TABLES.len(), INDEXES.len());
        let statements = if self.options.atomic {
            let mut tx = conn.begin().await?;
            let applied = execute_statements(&mut *tx, dialect).await?;
            tx.commit().await?;
            applied
        } else {
            execute_statements(conn, dialect).await?
        };

        for table in &TABLES {
            debug!("Table ready: {}", table.table);
        }

        Ok(MigrationReport {
            tables: TABLES.len(),
            indexes: INDEXES.len(),
            statements,
            server_version,
            elapsed: Duration::ZERO,
        })
    }
}

async fn execute_statements(
    conn: &mut AnyConnection,
    dialect: Dialect,
) -> Result<usize, PortalError> {
    let statements = schema::definition_statements(dialect);
    for statement in &statements {
        sqlx::query(statement)
            .execute(&mut *conn)
            .await
            .map_err(|source| PortalError::SchemaConflict {
                statement: first_line(statement),
                source,
            })?;
    }
    Ok(statements.len())
}

fn first_line(statement: &str) -> String {
    statement
        .lines()
        .next()
        .unwrap_or(statement)
        .trim_end_matches(" (")
        .to_string()
}
