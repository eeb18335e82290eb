// Database schema definitions
// This module contains the canonical table and index catalog for the portal
// database. Everything the migrator creates and the resetter drops is listed
// here; both the Postgres and SQLite scripts are rendered from it.

use super::dialect::Dialect;
use super::models::{
    ActType, AttendanceStatus, EntityType, Position, ProjectStatus, SessionStatus, VoteChoice,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Politicians,
    LegislativeSessions,
    Attendance,
    Projects,
    Votes,
    ExecutiveActs,
    Sources,
    Summaries,
}

impl Table {
    /// Creation order: every table appears after the tables it references.
    pub const ALL: [Table; 8] = [
        Table::Politicians,
        Table::LegislativeSessions,
        Table::Attendance,
        Table::Projects,
        Table::Votes,
        Table::ExecutiveActs,
        Table::Sources,
        Table::Summaries,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Politicians => "politicians",
            Table::LegislativeSessions => "legislative_sessions",
            Table::Attendance => "attendance",
            Table::Projects => "projects",
            Table::Votes => "votes",
            Table::ExecutiveActs => "executive_acts",
            Table::Sources => "sources",
            Table::Summaries => "summaries",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// `TABLES` is laid out in `Table::ALL` order.
    pub fn def(&self) -> &'static TableDef {
        &TABLES[*self as usize]
    }

    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.def().columns.iter().find(|c| c.name == name)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Uuid,
    Text,
    VarChar(u16),
    Date,
    Timestamp,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDefault {
    Now,
    Bool(bool),
    Text(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
}

impl OnDelete {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
            OnDelete::SetNull => "SET NULL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: Table,
    pub on_delete: OnDelete,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub primary_key: bool,
    pub nullable: bool,
    pub default: Option<ColumnDefault>,
    pub references: Option<ForeignKey>,
    /// Closed set of allowed values, rendered as a CHECK constraint.
    pub one_of: &'static [&'static str],
}

impl ColumnDef {
    const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            primary_key: false,
            nullable: true,
            default: None,
            references: None,
            one_of: &[],
        }
    }

    const fn id() -> Self {
        Self {
            primary_key: true,
            nullable: false,
            ..Self::new("id", ColumnType::Uuid)
        }
    }

    const fn not_null(self) -> Self {
        Self {
            nullable: false,
            ..self
        }
    }

    const fn default(self, default: ColumnDefault) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }

    const fn references(self, table: Table, on_delete: OnDelete) -> Self {
        Self {
            references: Some(ForeignKey { table, on_delete }),
            ..self
        }
    }

    const fn one_of(self, values: &'static [&'static str]) -> Self {
        Self {
            one_of: values,
            ..self
        }
    }

    fn render(&self, dialect: Dialect) -> String {
        let mut sql = format!("{} {}", self.name, dialect.column_type(self.ty));
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
            if let Some(default) = dialect.primary_key_default() {
                sql.push_str(" DEFAULT ");
                sql.push_str(default);
            }
        } else if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        match self.default {
            Some(ColumnDefault::Now) => sql.push_str(" DEFAULT CURRENT_TIMESTAMP"),
            Some(ColumnDefault::Bool(true)) => sql.push_str(" DEFAULT TRUE"),
            Some(ColumnDefault::Bool(false)) => sql.push_str(" DEFAULT FALSE"),
            Some(ColumnDefault::Text(value)) => sql.push_str(&format!(" DEFAULT '{}'", value)),
            None => {}
        }
        if let Some(fk) = self.references {
            sql.push_str(&format!(
                " REFERENCES {}(id) ON DELETE {}",
                fk.table.name(),
                fk.on_delete.as_sql()
            ));
        }
        if !self.one_of.is_empty() {
            let values: Vec<String> = self.one_of.iter().map(|v| format!("'{}'", v)).collect();
            sql.push_str(&format!(" CHECK ({} IN ({}))", self.name, values.join(", ")));
        }
        sql
    }
}

#[derive(Debug)]
pub struct TableDef {
    pub table: Table,
    pub columns: &'static [ColumnDef],
    pub unique: &'static [&'static [&'static str]],
    pub checks: &'static [&'static str],
}

impl TableDef {
    pub fn create_statement(&self, dialect: Dialect) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(|c| c.render(dialect)).collect();
        for columns in self.unique {
            parts.push(format!("UNIQUE ({})", columns.join(", ")));
        }
        for check in self.checks {
            parts.push(format!("CHECK ({})", check));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.table.name(),
            parts.join(",\n    ")
        )
    }

    /// Foreign keys declared by this table.
    pub fn foreign_keys(&self) -> impl Iterator<Item = (&'static str, ForeignKey)> + '_ {
        self.columns
            .iter()
            .filter_map(|c| c.references.map(|fk| (c.name, fk)))
    }
}

#[derive(Debug)]
pub struct IndexDef {
    pub name: &'static str,
    pub table: Table,
    pub columns: &'static [&'static str],
}

impl IndexDef {
    pub const fn new(name: &'static str, table: Table, columns: &'static [&'static str]) -> Self {
        Self {
            name,
            table,
            columns,
        }
    }

    pub fn create_statement(&self) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {}({})",
            self.name,
            self.table.name(),
            self.columns.join(", ")
        )
    }
}

const CREATED_AT: ColumnDef = ColumnDef::new("created_at", ColumnType::Timestamp)
    .not_null()
    .default(ColumnDefault::Now);
const UPDATED_AT: ColumnDef = ColumnDef::new("updated_at", ColumnType::Timestamp)
    .not_null()
    .default(ColumnDefault::Now);
const COLLECTED_AT: ColumnDef =
    ColumnDef::new("collected_at", ColumnType::Timestamp).default(ColumnDefault::Now);
const SOURCE_URL: ColumnDef = ColumnDef::new("source_url", ColumnType::Text);
const DESCRIPTION: ColumnDef = ColumnDef::new("description", ColumnType::Text);
const NOTES: ColumnDef = ColumnDef::new("notes", ColumnType::Text);

pub static TABLES: [TableDef; 8] = [
    TableDef {
        table: Table::Politicians,
        columns: &[
            ColumnDef::id(),
            ColumnDef::new("name", ColumnType::VarChar(255)).not_null(),
            ColumnDef::new("position", ColumnType::VarChar(100))
                .not_null()
                .one_of(Position::VALUES),
            ColumnDef::new("party", ColumnType::VarChar(50)),
            ColumnDef::new("email", ColumnType::VarChar(255)),
            ColumnDef::new("phone", ColumnType::VarChar(20)),
            ColumnDef::new("photo_url", ColumnType::Text),
            ColumnDef::new("birth_date", ColumnType::Date),
            ColumnDef::new("is_active", ColumnType::Boolean)
                .not_null()
                .default(ColumnDefault::Bool(true)),
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[],
        checks: &[],
    },
    TableDef {
        table: Table::LegislativeSessions,
        columns: &[
            ColumnDef::id(),
            ColumnDef::new("session_number", ColumnType::VarChar(50)).not_null(),
            ColumnDef::new("session_date", ColumnType::Date).not_null(),
            ColumnDef::new("session_type", ColumnType::VarChar(100)),
            ColumnDef::new("status", ColumnType::VarChar(50))
                .not_null()
                .default(ColumnDefault::Text("scheduled"))
                .one_of(SessionStatus::VALUES),
            DESCRIPTION,
            SOURCE_URL,
            COLLECTED_AT,
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[&["session_number"]],
        checks: &[],
    },
    TableDef {
        table: Table::Attendance,
        columns: &[
            ColumnDef::id(),
            ColumnDef::new("politician_id", ColumnType::Uuid)
                .not_null()
                .references(Table::Politicians, OnDelete::Cascade),
            ColumnDef::new("session_id", ColumnType::Uuid)
                .not_null()
                .references(Table::LegislativeSessions, OnDelete::Cascade),
            ColumnDef::new("status", ColumnType::VarChar(50))
                .not_null()
                .one_of(AttendanceStatus::VALUES),
            NOTES,
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[&["politician_id", "session_id"]],
        checks: &[],
    },
    TableDef {
        table: Table::Projects,
        columns: &[
            ColumnDef::id(),
            ColumnDef::new("project_number", ColumnType::VarChar(50)).not_null(),
            ColumnDef::new("author_id", ColumnType::Uuid)
                .references(Table::Politicians, OnDelete::SetNull),
            ColumnDef::new("title", ColumnType::VarChar(500)).not_null(),
            DESCRIPTION,
            ColumnDef::new("status", ColumnType::VarChar(50))
                .not_null()
                .default(ColumnDefault::Text("submitted"))
                .one_of(ProjectStatus::VALUES),
            ColumnDef::new("project_type", ColumnType::VarChar(100)),
            ColumnDef::new("presentation_date", ColumnType::Date),
            ColumnDef::new("theme", ColumnType::VarChar(100)),
            SOURCE_URL,
            COLLECTED_AT,
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[&["project_number"]],
        checks: &[],
    },
    TableDef {
        table: Table::Votes,
        columns: &[
            ColumnDef::id(),
            ColumnDef::new("project_id", ColumnType::Uuid)
                .not_null()
                .references(Table::Projects, OnDelete::Cascade),
            ColumnDef::new("politician_id", ColumnType::Uuid)
                .not_null()
                .references(Table::Politicians, OnDelete::Cascade),
            ColumnDef::new("vote", ColumnType::VarChar(50))
                .not_null()
                .one_of(VoteChoice::VALUES),
            NOTES,
            CREATED_AT,
        ],
        unique: &[&["project_id", "politician_id"]],
        checks: &[],
    },
    TableDef {
        table: Table::ExecutiveActs,
        columns: &[
            ColumnDef::id(),
            ColumnDef::new("act_number", ColumnType::VarChar(50)).not_null(),
            ColumnDef::new("act_type", ColumnType::VarChar(100))
                .not_null()
                .one_of(ActType::VALUES),
            ColumnDef::new("author_id", ColumnType::Uuid)
                .references(Table::Politicians, OnDelete::SetNull),
            ColumnDef::new("title", ColumnType::VarChar(500)).not_null(),
            DESCRIPTION,
            ColumnDef::new("publication_date", ColumnType::Date).not_null(),
            SOURCE_URL,
            COLLECTED_AT,
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[&["act_number"]],
        checks: &[],
    },
    // entity_id is a polymorphic reference and deliberately carries no FK.
    TableDef {
        table: Table::Sources,
        columns: &[
            ColumnDef::id(),
            ColumnDef::new("entity_type", ColumnType::VarChar(100))
                .not_null()
                .one_of(EntityType::VALUES),
            ColumnDef::new("entity_id", ColumnType::Uuid).not_null(),
            ColumnDef::new("source_url", ColumnType::Text).not_null(),
            ColumnDef::new("source_name", ColumnType::VarChar(255)),
            COLLECTED_AT,
            ColumnDef::new("content_hash", ColumnType::VarChar(64)),
            CREATED_AT,
        ],
        unique: &[],
        checks: &[],
    },
    TableDef {
        table: Table::Summaries,
        columns: &[
            ColumnDef::id(),
            ColumnDef::new("entity_type", ColumnType::VarChar(100))
                .not_null()
                .one_of(EntityType::VALUES),
            ColumnDef::new("entity_id", ColumnType::Uuid).not_null(),
            ColumnDef::new("summary_text", ColumnType::Text).not_null(),
            ColumnDef::new("generated_by", ColumnType::VarChar(100)),
            ColumnDef::new("is_reviewed", ColumnType::Boolean)
                .not_null()
                .default(ColumnDefault::Bool(false)),
            ColumnDef::new("reviewed_by", ColumnType::Uuid)
                .references(Table::Politicians, OnDelete::SetNull),
            ColumnDef::new("reviewed_at", ColumnType::Timestamp),
            CREATED_AT,
            UPDATED_AT,
        ],
        unique: &[],
        checks: &["reviewed_at IS NULL OR is_reviewed"],
    },
];

pub static INDEXES: [IndexDef; 15] = [
    IndexDef::new("idx_politicians_position", Table::Politicians, &["position"]),
    IndexDef::new("idx_politicians_is_active", Table::Politicians, &["is_active"]),
    IndexDef::new("idx_legislative_sessions_date", Table::LegislativeSessions, &["session_date"]),
    IndexDef::new("idx_attendance_politician", Table::Attendance, &["politician_id"]),
    IndexDef::new("idx_attendance_session", Table::Attendance, &["session_id"]),
    IndexDef::new("idx_projects_author", Table::Projects, &["author_id"]),
    IndexDef::new("idx_projects_status", Table::Projects, &["status"]),
    IndexDef::new("idx_projects_theme", Table::Projects, &["theme"]),
    IndexDef::new("idx_projects_date", Table::Projects, &["presentation_date"]),
    IndexDef::new("idx_votes_project", Table::Votes, &["project_id"]),
    IndexDef::new("idx_votes_politician", Table::Votes, &["politician_id"]),
    IndexDef::new("idx_executive_acts_author", Table::ExecutiveActs, &["author_id"]),
    IndexDef::new("idx_executive_acts_date", Table::ExecutiveActs, &["publication_date"]),
    IndexDef::new("idx_sources_entity", Table::Sources, &["entity_type", "entity_id"]),
    IndexDef::new("idx_summaries_entity", Table::Summaries, &["entity_type", "entity_id"]),
];

/// Deepest dependents first, `politicians` last.
pub const DROP_ORDER: [Table; 8] = [
    Table::Summaries,
    Table::Sources,
    Table::Votes,
    Table::ExecutiveActs,
    Table::Projects,
    Table::Attendance,
    Table::LegislativeSessions,
    Table::Politicians,
];

/// Every statement of the definition script, tables first, then indexes.
/// Each statement is guarded with `IF NOT EXISTS`.
pub fn definition_statements(dialect: Dialect) -> Vec<String> {
    TABLES
        .iter()
        .map(|t| t.create_statement(dialect))
        .chain(INDEXES.iter().map(IndexDef::create_statement))
        .collect()
}

pub fn definition_script(dialect: Dialect) -> String {
    let mut script = definition_statements(dialect).join(";\n\n");
    script.push_str(";\n");
    script
}
