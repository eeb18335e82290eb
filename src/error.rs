use thiserror::Error;

use crate::database::schema::Table;

impl From<sqlx::Error> for PortalError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl From<config::ConfigError> for PortalError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store unreachable: {0}")]
    Connectivity(String),

    #[error("Schema statement failed: {statement}")]
    SchemaConflict {
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to drop table {table}")]
    ResetFailed {
        table: Table,
        #[source]
        source: sqlx::Error,
    },

    #[error("Cannot insert {batch} before {missing} ids are captured")]
    DependencyOrder {
        batch: Table,
        missing: Table,
    },

    #[error("Duplicate key in {entity}: {detail}")]
    DuplicateKey { entity: String, detail: String },

    #[error("Seeding batch {batch} failed")]
    SeedFailed {
        batch: Table,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, PortalError>;

impl PortalError {
    pub fn connectivity(err: impl std::fmt::Display) -> Self {
        Self::Connectivity(err.to_string())
    }

    /// Classify a failed insert: unique violations are reported as
    /// [`PortalError::DuplicateKey`], everything else as a batch failure.
    pub fn from_insert(batch: Table, err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => Self::DuplicateKey {
                entity: batch.to_string(),
                detail: db_err.message().to_string(),
            },
            _ => Self::SeedFailed { batch, source: err },
        }
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Short machine-readable name used in log events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Connectivity(_) => "connectivity",
            Self::SchemaConflict { .. } => "schema_conflict",
            Self::ResetFailed { .. } => "reset_failed",
            Self::DependencyOrder { .. } => "dependency_order",
            Self::DuplicateKey { .. } => "duplicate_key",
            Self::SeedFailed { .. } => "seed_failed",
            Self::Database(_) => "database",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_is_prefixed_once() {
        let source = config::ConfigError::Message("pool_max is not a number".to_string());
        let err = PortalError::from(source);
        assert_eq!(err.to_string(), "Configuration error: pool_max is not a number");
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_dependency_order_names_both_tables() {
        let err = PortalError::DependencyOrder {
            batch: Table::Votes,
            missing: Table::Projects,
        };
        assert_eq!(err.to_string(), "Cannot insert votes before projects ids are captured");
        assert!(!err.is_duplicate_key());
    }
}
