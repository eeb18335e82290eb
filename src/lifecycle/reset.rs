use std::time::Duration;

use sqlx::{AnyConnection, Connection};
use tracing::{info, warn};

use super::{run_logged, LifecycleOptions, Operation, OperationReport};
use crate::database::schema::{Table, DROP_ORDER};
use crate::database::{ConnectionManager, Dialect};
use crate::error::PortalError;

#[derive(Debug, Clone)]
pub struct ResetReport {
    /// Tables handled, in drop order. Tables that were already absent are
    /// included; `DROP TABLE IF EXISTS` makes no distinction.
    pub tables: Vec<Table>,
    pub elapsed: Duration,
}

impl OperationReport for ResetReport {
    fn items(&self) -> usize {
        self.tables.len()
    }

    fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }
}

/// Drops every catalog table, dependents first and `politicians` last.
///
/// This is destructive maintenance, not a unit of work: a failure stops the
/// sequence and tables dropped before it stay dropped.
#[derive(Debug, Clone, Default)]
pub struct Resetter {
    options: LifecycleOptions,
}

impl Resetter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: LifecycleOptions) -> Self {
        Self { options }
    }

    pub async fn reset_all(&self, manager: &ConnectionManager) -> Result<ResetReport, PortalError> {
        warn!("Dropping all portal tables; every row will be lost");
        run_logged(Operation::Reset, self.options.atomic, async {
            let mut conn = manager.acquire().await?;
            let result = self.reset_on(&mut conn, manager.dialect()).await;
            manager.release(conn);
            result
        })
        .await
    }

    async fn reset_on(
        &self,
        conn: &mut AnyConnection,
        dialect: Dialect,
    ) -> Result<ResetReport, PortalError> {
        let tables = if self.options.atomic {
            let mut tx = conn.begin().await?;
            let tables = drop_tables(&mut *tx, dialect).await?;
            tx.commit().await?;
            tables
        } else {
            drop_tables(conn, dialect).await?
        };

        Ok(ResetReport {
            tables,
            elapsed: Duration::ZERO,
        })
    }
}

async fn drop_tables(
    conn: &mut AnyConnection,
    dialect: Dialect,
) -> Result<Vec<Table>, PortalError> {
    let mut dropped = Vec::with_capacity(DROP_ORDER.len());
    for table in DROP_ORDER {
        sqlx::query(&dialect.drop_table(table.name()))
            .execute(&mut *conn)
            .await
            .map_err(|source| PortalError::ResetFailed { table, source })?;
        info!("Dropped table {}", table);
        dropped.push(table);
    }
    Ok(dropped)
}
