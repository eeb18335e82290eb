use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Closed string-backed enums stored as VARCHAR with a CHECK constraint.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $value)] $variant),+
        }

        impl $name {
            pub const VALUES: &'static [&'static str] = &[$($value),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// Elected role held by a politician
    Position {
        Councilmember => "councilmember",
        Mayor => "mayor",
    }
);

string_enum!(SessionStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
});

string_enum!(AttendanceStatus {
    Present => "present",
    Absent => "absent",
    Excused => "excused",
    Leave => "leave",
});

string_enum!(ProjectStatus {
    Submitted => "submitted",
    InProgress => "in_progress",
    Approved => "approved",
    Rejected => "rejected",
    Archived => "archived",
});

string_enum!(VoteChoice {
    Yes => "yes",
    No => "no",
    Abstain => "abstain",
});

string_enum!(
    /// Kind of act published by the executive
    ActType {
        Decree => "decree",
        Ordinance => "ordinance",
        Resolution => "resolution",
    }
);

string_enum!(
    /// Tag stored next to a polymorphic `entity_id`
    EntityType {
        Politician => "politician",
        LegislativeSession => "legislative_session",
        Attendance => "attendance",
        Project => "project",
        Vote => "vote",
        ExecutiveAct => "executive_act",
    }
);

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(PoliticianId);
entity_id!(SessionId);
entity_id!(AttendanceId);
entity_id!(ProjectId);
entity_id!(VoteId);
entity_id!(ExecutiveActId);
entity_id!(SourceId);
entity_id!(SummaryId);

/// Weak reference from a provenance record to any entity.
///
/// The store keeps only the `(entity_type, entity_id)` pair and never checks
/// that the target row exists; whoever writes the record is responsible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "entity_type", content = "entity_id", rename_all = "snake_case")]
pub enum EntityRef {
    Politician(PoliticianId),
    LegislativeSession(SessionId),
    Attendance(AttendanceId),
    Project(ProjectId),
    Vote(VoteId),
    ExecutiveAct(ExecutiveActId),
}

impl EntityRef {
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityRef::Politician(_) => EntityType::Politician,
            EntityRef::LegislativeSession(_) => EntityType::LegislativeSession,
            EntityRef::Attendance(_) => EntityType::Attendance,
            EntityRef::Project(_) => EntityType::Project,
            EntityRef::Vote(_) => EntityType::Vote,
            EntityRef::ExecutiveAct(_) => EntityType::ExecutiveAct,
        }
    }

    pub fn entity_id(&self) -> Uuid {
        match self {
            EntityRef::Politician(id) => id.0,
            EntityRef::LegislativeSession(id) => id.0,
            EntityRef::Attendance(id) => id.0,
            EntityRef::Project(id) => id.0,
            EntityRef::Vote(id) => id.0,
            EntityRef::ExecutiveAct(id) => id.0,
        }
    }

    /// Rebuild a reference from its stored pair.
    pub fn from_parts(entity_type: EntityType, id: Uuid) -> Self {
        match entity_type {
            EntityType::Politician => EntityRef::Politician(PoliticianId(id)),
            EntityType::LegislativeSession => EntityRef::LegislativeSession(SessionId(id)),
            EntityType::Attendance => EntityRef::Attendance(AttendanceId(id)),
            EntityType::Project => EntityRef::Project(ProjectId(id)),
            EntityType::Vote => EntityRef::Vote(VoteId(id)),
            EntityType::ExecutiveAct => EntityRef::ExecutiveAct(ExecutiveActId(id)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPolitician {
    pub name: String,
    pub position: Position,
    pub party: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub session_number: String,
    pub session_date: NaiveDate,
    pub session_type: Option<String>,
    pub status: SessionStatus,
    pub description: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttendance {
    pub politician_id: PoliticianId,
    pub session_id: SessionId,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProject {
    pub project_number: String,
    pub author_id: Option<PoliticianId>,
    pub title: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub project_type: Option<String>,
    pub presentation_date: Option<NaiveDate>,
    pub theme: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVote {
    pub project_id: ProjectId,
    pub politician_id: PoliticianId,
    pub choice: VoteChoice,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExecutiveAct {
    pub act_number: String,
    pub act_type: ActType,
    pub author_id: Option<PoliticianId>,
    pub title: String,
    pub description: Option<String>,
    pub publication_date: NaiveDate,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSource {
    pub entity: EntityRef,
    pub source_url: String,
    pub source_name: Option<String>,
    pub content_hash: Option<String>,
}

/// Editorial sign-off on a summary. A summary without one is unreviewed,
/// which keeps `reviewed_at` empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub reviewer: Option<PoliticianId>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSummary {
    pub entity: EntityRef,
    pub summary_text: String,
    pub generated_by: Option<String>,
    pub review: Option<Review>,
}

/// SHA-256 of collected content, hex encoded (64 chars, fits `content_hash`).
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}
