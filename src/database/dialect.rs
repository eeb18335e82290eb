//! SQL dialect differences between the production store (PostgreSQL) and the
//! embedded store used for local runs and tests (SQLite).

use serde::{Deserialize, Serialize};

use super::schema::ColumnType;
use crate::error::PortalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "postgres" | "postgresql" | "pg" => Some(Dialect::Postgres),
            "sqlite" => Some(Dialect::Sqlite),
            _ => None,
        }
    }

    /// Detect the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Result<Self, PortalError> {
        let scheme = url.split(':').next().unwrap_or_default();
        Self::parse(scheme).ok_or_else(|| {
            PortalError::Config(format!("Unsupported database URL scheme: {:?}", scheme))
        })
    }

    pub fn column_type(&self, ty: ColumnType) -> String {
        match (self, ty) {
            (Dialect::Postgres, ColumnType::Uuid) => "UUID".to_string(),
            (Dialect::Postgres, ColumnType::Date) => "DATE".to_string(),
            (Dialect::Postgres, ColumnType::Timestamp) => "TIMESTAMPTZ".to_string(),
            (Dialect::Sqlite, ColumnType::Uuid)
            | (Dialect::Sqlite, ColumnType::Date)
            | (Dialect::Sqlite, ColumnType::Timestamp) => "TEXT".to_string(),
            (_, ColumnType::Text) => "TEXT".to_string(),
            (_, ColumnType::VarChar(len)) => format!("VARCHAR({})", len),
            (_, ColumnType::Boolean) => "BOOLEAN".to_string(),
        }
    }

    /// Server-side default for a primary key column, if the store has one.
    pub fn primary_key_default(&self) -> Option<&'static str> {
        match self {
            Dialect::Postgres => Some("gen_random_uuid()"),
            Dialect::Sqlite => None,
        }
    }

    /// Placeholder expression for the `n`th (1-based) bound parameter.
    ///
    /// Values travel as text through the `Any` driver, so Postgres needs an
    /// explicit cast for typed columns.
    pub fn placeholder(&self, n: usize, ty: ColumnType) -> String {
        match self {
            Dialect::Postgres => match ty {
                ColumnType::Uuid => format!("CAST(${} AS UUID)", n),
                ColumnType::Date => format!("CAST(${} AS DATE)", n),
                ColumnType::Timestamp => format!("CAST(${} AS TIMESTAMPTZ)", n),
                _ => format!("${}", n),
            },
            Dialect::Sqlite => "?".to_string(),
        }
    }

    /// Expression reading a typed column back as text.
    pub fn text_expr(&self, column: &str, ty: ColumnType) -> String {
        match (self, ty) {
            (Dialect::Postgres, ColumnType::Uuid)
            | (Dialect::Postgres, ColumnType::Date)
            | (Dialect::Postgres, ColumnType::Timestamp) => format!("CAST({} AS TEXT)", column),
            _ => column.to_string(),
        }
    }

    pub fn drop_table(&self, table: &str) -> String {
        match self {
            Dialect::Postgres => format!("DROP TABLE IF EXISTS {} CASCADE", table),
            Dialect::Sqlite => format!("DROP TABLE IF EXISTS {}", table),
        }
    }

    /// Round-trip probe returning `(server_time, server_version)` as text.
    pub fn probe_query(&self) -> &'static str {
        match self {
            Dialect::Postgres => "SELECT CAST(NOW() AS TEXT), version()",
            Dialect::Sqlite => "SELECT CURRENT_TIMESTAMP, 'SQLite ' || sqlite_version()",
        }
    }

    /// Lists user tables and indexes as `(kind, name)` rows.
    pub fn objects_query(&self) -> &'static str {
        match self {
            Dialect::Postgres => {
                r#"
                SELECT 'table', CAST(table_name AS TEXT) FROM information_schema.tables
                WHERE table_schema = current_schema() AND table_type = 'BASE TABLE'
                UNION ALL
                SELECT 'index', CAST(indexname AS TEXT) FROM pg_indexes
                WHERE schemaname = current_schema() AND indexname LIKE 'idx_%'
                ORDER BY 1, 2
                "#
            }
            Dialect::Sqlite => {
                r#"
                SELECT type, name FROM sqlite_master
                WHERE type IN ('table', 'index') AND name NOT LIKE 'sqlite_%'
                ORDER BY 1, 2
                "#
            }
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
