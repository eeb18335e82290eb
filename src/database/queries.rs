use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{AnyConnection, Row};
use uuid::Uuid;

use super::dialect::Dialect;
use super::models::*;
use super::schema::{ColumnType, Table};
use crate::error::PortalError;

/// A value bound into a catalog-driven statement. Everything travels as text,
/// bool or NULL so the same statement works through the `Any` driver on both
/// backends.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Uuid(Uuid),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Bool(bool),
    Null,
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Single-row `INSERT` whose column types come from the schema catalog.
#[derive(Debug, Clone)]
pub struct Insert {
    table: Table,
    values: Vec<(&'static str, Value)>,
}

impl Insert {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            values: Vec::new(),
        }
    }

    pub fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.values.push((column, value.into()));
        self
    }

    pub fn sql(&self, dialect: Dialect) -> Result<String, sqlx::Error> {
        let mut columns = Vec::with_capacity(self.values.len());
        let mut placeholders = Vec::with_capacity(self.values.len());
        for (n, (column, _)) in self.values.iter().enumerate() {
            let def = self
                .table
                .column(column)
                .ok_or_else(|| sqlx::Error::ColumnNotFound(format!("{}.{}", self.table, column)))?;
            columns.push(*column);
            placeholders.push(dialect.placeholder(n + 1, def.ty));
        }
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        ))
    }

    pub async fn execute(
        &self,
        conn: &mut AnyConnection,
        dialect: Dialect,
    ) -> Result<u64, sqlx::Error> {
        let sql = self.sql(dialect)?;
        let mut query = sqlx::query(&sql);
        for (_, value) in &self.values {
            query = match value {
                Value::Uuid(v) => query.bind(v.to_string()),
                Value::Text(v) => query.bind(v.clone()),
                Value::Date(v) => query.bind(v.format("%Y-%m-%d").to_string()),
                Value::Timestamp(v) => query.bind(v.format("%Y-%m-%d %H:%M:%S%:z").to_string()),
                Value::Bool(v) => query.bind(*v),
                Value::Null => query.bind(Option::<String>::None),
            };
        }
        Ok(query.execute(conn).await?.rows_affected())
    }
}

pub struct Queries;

impl Queries {
    pub async fn insert_politician(
        conn: &mut AnyConnection,
        dialect: Dialect,
        politician: &NewPolitician,
    ) -> Result<PoliticianId, PortalError> {
        let id = PoliticianId::new();
        Insert::new(Table::Politicians)
            .set("id", id.0)
            .set("name", politician.name.as_str())
            .set("position", politician.position.as_str())
            .set("party", politician.party.clone())
            .set("email", politician.email.clone())
            .set("phone", politician.phone.clone())
            .set("photo_url", politician.photo_url.clone())
            .set("birth_date", politician.birth_date)
            .set("is_active", politician.is_active)
            .execute(conn, dialect)
            .await
            .map_err(|e| PortalError::from_insert(Table::Politicians, e))?;
        Ok(id)
    }

    pub async fn insert_session(
        conn: &mut AnyConnection,
        dialect: Dialect,
        session: &NewSession,
    ) -> Result<SessionId, PortalError> {
        let id = SessionId::new();
        Insert::new(Table::LegislativeSessions)
            .set("id", id.0)
            .set("session_number", session.session_number.as_str())
            .set("session_date", session.session_date)
            .set("session_type", session.session_type.clone())
            .set("status", session.status.as_str())
            .set("description", session.description.clone())
            .set("source_url", session.source_url.clone())
            .execute(conn, dialect)
            .await
            .map_err(|e| PortalError::from_insert(Table::LegislativeSessions, e))?;
        Ok(id)
    }

    pub async fn insert_attendance(
        conn: &mut AnyConnection,
        dialect: Dialect,
        attendance: &NewAttendance,
    ) -> Result<AttendanceId, PortalError> {
        let id = AttendanceId::new();
        Insert::new(Table::Attendance)
            .set("id", id.0)
            .set("politician_id", attendance.politician_id.0)
            .set("session_id", attendance.session_id.0)
            .set("status", attendance.status.as_str())
            .set("notes", attendance.notes.clone())
            .execute(conn, dialect)
            .await
            .map_err(|e| PortalError::from_insert(Table::Attendance, e))?;
        Ok(id)
    }

    pub async fn insert_project(
        conn: &mut AnyConnection,
        dialect: Dialect,
        project: &NewProject,
    ) -> Result<ProjectId, PortalError> {
        let id = ProjectId::new();
        Insert::new(Table::Projects)
            .set("id", id.0)
            .set("project_number", project.project_number.as_str())
            .set("author_id", project.author_id.map(|a| a.0))
            .set("title", project.title.as_str())
            .set("description", project.description.clone())
            .set("status", project.status.as_str())
            .set("project_type", project.project_type.clone())
            .set("presentation_date", project.presentation_date)
            .set("theme", project.theme.clone())
            .set("source_url", project.source_url.clone())
            .execute(conn, dialect)
            .await
            .map_err(|e| PortalError::from_insert(Table::Projects, e))?;
        Ok(id)
    }

    pub async fn insert_vote(
        conn: &mut AnyConnection,
        dialect: Dialect,
        vote: &NewVote,
    ) -> Result<VoteId, PortalError> {
        let id = VoteId::new();
        Insert::new(Table::Votes)
            .set("id", id.0)
            .set("project_id", vote.project_id.0)
            .set("politician_id", vote.politician_id.0)
            .set("vote", vote.choice.as_str())
            .set("notes", vote.notes.clone())
            .execute(conn, dialect)
            .await
            .map_err(|e| PortalError::from_insert(Table::Votes, e))?;
        Ok(id)
    }

    pub async fn insert_executive_act(
        conn: &mut AnyConnection,
        dialect: Dialect,
        act: &NewExecutiveAct,
    ) -> Result<ExecutiveActId, PortalError> {
        let id = ExecutiveActId::new();
        Insert::new(Table::ExecutiveActs)
            .set("id", id.0)
            .set("act_number", act.act_number.as_str())
            .set("act_type", act.act_type.as_str())
            .set("author_id", act.author_id.map(|a| a.0))
            .set("title", act.title.as_str())
            .set("description", act.description.clone())
            .set("publication_date", act.publication_date)
            .set("source_url", act.source_url.clone())
            .execute(conn, dialect)
            .await
            .map_err(|e| PortalError::from_insert(Table::ExecutiveActs, e))?;
        Ok(id)
    }

    /// The referenced entity is not checked; callers must only pass ids they
    /// have just written or read back.
    pub async fn insert_source(
        conn: &mut AnyConnection,
        dialect: Dialect,
        source: &NewSource,
    ) -> Result<SourceId, PortalError> {
        let id = SourceId::new();
        Insert::new(Table::Sources)
            .set("id", id.0)
            .set("entity_type", source.entity.entity_type().as_str())
            .set("entity_id", source.entity.entity_id())
            .set("source_url", source.source_url.as_str())
            .set("source_name", source.source_name.clone())
            .set("content_hash", source.content_hash.clone())
            .execute(conn, dialect)
            .await
            .map_err(|e| PortalError::from_insert(Table::Sources, e))?;
        Ok(id)
    }

    pub async fn insert_summary(
        conn: &mut AnyConnection,
        dialect: Dialect,
        summary: &NewSummary,
    ) -> Result<SummaryId, PortalError> {
        let id = SummaryId::new();
        let review = summary.review.as_ref();
        Insert::new(Table::Summaries)
            .set("id", id.0)
            .set("entity_type", summary.entity.entity_type().as_str())
            .set("entity_id", summary.entity.entity_id())
            .set("summary_text", summary.summary_text.as_str())
            .set("generated_by", summary.generated_by.clone())
            .set("is_reviewed", review.is_some())
            .set("reviewed_by", review.and_then(|r| r.reviewer).map(|r| r.0))
            .set("reviewed_at", review.map(|r| r.reviewed_at))
            .execute(conn, dialect)
            .await
            .map_err(|e| PortalError::from_insert(Table::Summaries, e))?;
        Ok(id)
    }

    pub async fn count(conn: &mut AnyConnection, table: Table) -> Result<i64, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let row = sqlx::query(&sql).fetch_one(conn).await?;
        row.try_get(0)
    }

    /// Row count filtered on a single text column.
    pub async fn count_where(
        conn: &mut AnyConnection,
        dialect: Dialect,
        table: Table,
        column: &str,
        value: &str,
    ) -> Result<i64, sqlx::Error> {
        let ty = table
            .column(column)
            .map(|c| c.ty)
            .ok_or_else(|| sqlx::Error::ColumnNotFound(format!("{}.{}", table, column)))?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = {}",
            table,
            column,
            dialect.placeholder(1, ty)
        );
        let row = sqlx::query(&sql).bind(value.to_string()).fetch_one(conn).await?;
        row.try_get(0)
    }

    /// Number of rows sharing the same key, for every key that appears more
    /// than once. Empty when the key columns are unique.
    pub async fn duplicate_keys(
        conn: &mut AnyConnection,
        table: Table,
        columns: &[&str],
    ) -> Result<i64, sqlx::Error> {
        let key = columns.join(", ");
        let sql = format!(
            "SELECT COUNT(*) FROM \
             (SELECT {key} FROM {table} GROUP BY {key} HAVING COUNT(*) > 1) dup",
            key = key,
            table = table
        );
        let row = sqlx::query(&sql).fetch_one(conn).await?;
        row.try_get(0)
    }

    /// Rows whose foreign key column points at no existing parent row.
    pub async fn orphaned_rows(
        conn: &mut AnyConnection,
        table: Table,
        column: &str,
    ) -> Result<i64, sqlx::Error> {
        let parent = table
            .column(column)
            .and_then(|c| c.references)
            .ok_or_else(|| sqlx::Error::ColumnNotFound(format!("{}.{}", table, column)))?
            .table;
        let sql = format!(
            "SELECT COUNT(*) FROM {table} c WHERE c.{column} IS NOT NULL \
             AND NOT EXISTS (SELECT 1 FROM {parent} p WHERE p.id = c.{column})",
            table = table,
            column = column,
            parent = parent
        );
        let row = sqlx::query(&sql).fetch_one(conn).await?;
        row.try_get(0)
    }

    pub async fn delete_by_id(
        conn: &mut AnyConnection,
        dialect: Dialect,
        table: Table,
        id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let sql = format!(
            "DELETE FROM {} WHERE id = {}",
            table,
            dialect.placeholder(1, ColumnType::Uuid)
        );
        let result = sqlx::query(&sql).bind(id.to_string()).execute(conn).await?;
        Ok(result.rows_affected())
    }

    /// Text rendering of a nullable UUID column, `None` when the row is
    /// missing or the column is NULL.
    pub async fn reference_of(
        conn: &mut AnyConnection,
        dialect: Dialect,
        table: Table,
        column: &str,
        id: Uuid,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = {}",
            dialect.text_expr(column, ColumnType::Uuid),
            table,
            dialect.placeholder(1, ColumnType::Uuid)
        );
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(conn)
            .await?;
        let value: Option<String> = match row {
            Some(row) => row.try_get(0)?,
            None => None,
        };
        value
            .map(|v| Uuid::parse_str(&v).map_err(|e| sqlx::Error::Decode(Box::new(e))))
            .transpose()
    }

    /// Row count of every catalog table, `None` for tables the store does
    /// not have. Other failures are returned as-is.
    pub async fn table_counts(
        conn: &mut AnyConnection,
        dialect: Dialect,
    ) -> Result<Vec<(Table, Option<i64>)>, sqlx::Error> {
        let objects = Self::list_objects(conn, dialect).await?;
        let mut counts = Vec::with_capacity(Table::ALL.len());
        for table in Table::ALL {
            let present = objects
                .iter()
                .any(|(kind, name)| kind == "table" && name == table.name());
            let rows = if present {
                Some(Self::count(conn, table).await?)
            } else {
                None
            };
            counts.push((table, rows));
        }
        Ok(counts)
    }

    /// Tables and `idx_*` indexes currently present, as `(kind, name)`.
    pub async fn list_objects(
        conn: &mut AnyConnection,
        dialect: Dialect,
    ) -> Result<Vec<(String, String)>, sqlx::Error> {
        let rows = sqlx::query(dialect.objects_query()).fetch_all(conn).await?;
        rows.into_iter()
            .map(|row| Ok((row.try_get(0)?, row.try_get(1)?)))
            .collect()
    }
}
