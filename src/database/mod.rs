pub mod dialect;
pub mod models;
pub mod queries;
pub mod schema;

use std::time::Duration;

use sqlx::any::AnyPoolOptions;
use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyConnection, AnyPool, Row};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::PortalError;
pub use dialect::Dialect;

/// Result of the connectivity round-trip.
#[derive(Debug, Clone)]
pub struct ProbeInfo {
    pub server_time: String,
    pub server_version: String,
}

/// Owns the pool of store connections. Built once by the caller, handed to
/// lifecycle operations by reference and closed with [`shutdown`].
///
/// [`shutdown`]: ConnectionManager::shutdown
pub struct ConnectionManager {
    pool: AnyPool,
    dialect: Dialect,
}

impl ConnectionManager {
    /// Build the pool without opening a connection; unreachable stores are
    /// reported by the first [`acquire`](Self::acquire).
    pub fn connect(config: &DatabaseConfig) -> Result<Self, PortalError> {
        let url = config.connection_url();
        let options = AnyPoolOptions::new()
            .min_connections(config.pool_min)
            .max_connections(config.pool_max)
            .acquire_timeout(config.connect_timeout())
            .idle_timeout(Some(config.idle_timeout()));
        Self::with_options(&url, options)
    }

    pub fn connect_url(url: &str) -> Result<Self, PortalError> {
        Self::connect(&DatabaseConfig::from_url(url))
    }

    /// Private SQLite database living as long as this manager. The pool is
    /// pinned to one connection that is never recycled, otherwise each new
    /// connection would open a fresh empty database.
    pub fn in_memory() -> Result<Self, PortalError> {
        let options = AnyPoolOptions::new()
            .min_connections(0)
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(None)
            .max_lifetime(None);
        Self::with_options("sqlite::memory:", options)
    }

    fn with_options(url: &str, options: AnyPoolOptions) -> Result<Self, PortalError> {
        sqlx::any::install_default_drivers();
        let dialect = Dialect::from_url(url)?;

        let options = match dialect {
            Dialect::Sqlite => options.after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON").execute(conn).await?;
                    Ok(())
                })
            }),
            Dialect::Postgres => options,
        };

        let pool = options
            .connect_lazy(url)
            .map_err(|e| PortalError::Config(format!("Invalid database URL: {}", e)))?;
        debug!("Connection pool created for {} store", dialect);
        Ok(Self { pool, dialect })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Exclusive connection for one lifecycle operation. Fails fast once the
    /// pool's acquire timeout elapses.
    pub async fn acquire(&self) -> Result<PoolConnection<Any>, PortalError> {
        self.pool.acquire().await.map_err(PortalError::connectivity)
    }

    /// Hand a connection back to the pool.
    pub fn release(&self, conn: PoolConnection<Any>) {
        drop(conn);
    }

    /// Round-trip check that the store answers queries.
    pub async fn probe(&self, conn: &mut AnyConnection) -> Result<ProbeInfo, PortalError> {
        let row = sqlx::query(self.dialect.probe_query())
            .fetch_one(conn)
            .await
            .map_err(PortalError::connectivity)?;
        let info = ProbeInfo {
            server_time: row.try_get(0).map_err(PortalError::connectivity)?,
            server_version: row.try_get(1).map_err(PortalError::connectivity)?,
        };
        info!(
            "Database connection test successful (time: {}, server: {})",
            info.server_time,
            info.server_version.split(',').next().unwrap_or_default()
        );
        Ok(info)
    }

    /// Drain and close every pooled connection.
    pub async fn shutdown(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}
