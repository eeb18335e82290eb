//! Sample data population
//!
//! Inserts a small, fixed-shape dataset that touches every table and every
//! relationship. Parents are always written before children and their ids
//! are kept in [`SeedState`]; asking for a child batch before its parents
//! exist is a [`PortalError::DependencyOrder`].
//!
//! Seeding is not idempotent. Running it twice without a reset trips the
//! unique keys on `session_number`, `project_number` and `act_number`.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use sqlx::{AnyConnection, Connection};
use tracing::info;

use super::{run_logged, LifecycleOptions, Operation, OperationReport};
use crate::database::models::*;
use crate::database::queries::Queries;
use crate::database::schema::Table;
use crate::database::{ConnectionManager, Dialect};
use crate::error::PortalError;

const CHAMBER_NAME: &str = "Câmara Municipal de Santos";
const CHAMBER_POLITICIANS_URL: &str = "https://camarasantos.sp.gov.br/vereadores";
const CHAMBER_PROJECTS_URL: &str = "https://camarasantos.sp.gov.br/projetos";
const GAZETTE_NAME: &str = "Diário Oficial de Santos";
const GAZETTE_URL: &str = "https://diariooficial.santos.sp.gov.br";
const SUMMARY_GENERATOR: &str = "sample_model_v1";

/// Size of the attendance and vote subsets, and the odds used to fill them.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedConfig {
    /// Attendance covers the first N politicians...
    pub attendance_politicians: usize,
    /// ...times the first M sessions.
    pub attendance_sessions: usize,
    pub vote_projects: usize,
    pub vote_politicians: usize,
    pub present_probability: f64,
    pub yes_probability: f64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            attendance_politicians: 5,
            attendance_sessions: 2,
            vote_projects: 2,
            vote_politicians: 5,
            present_probability: 0.8,
            yes_probability: 0.7,
        }
    }
}

impl SeedConfig {
    pub fn validate(&self) -> Result<(), PortalError> {
        for (name, p) in [
            ("present_probability", self.present_probability),
            ("yes_probability", self.yes_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(PortalError::Config(format!(
                    "{} must be within 0..=1, got {}",
                    name, p
                )));
            }
        }
        Ok(())
    }

    /// Upper bound on attendance rows for the given table sizes.
    pub fn max_attendance(&self, politicians: usize, sessions: usize) -> usize {
        self.attendance_politicians.min(politicians) * self.attendance_sessions.min(sessions)
    }

    pub fn max_votes(&self, projects: usize, politicians: usize) -> usize {
        self.vote_projects.min(projects) * self.vote_politicians.min(politicians)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedReport {
    pub politicians: usize,
    pub sessions: usize,
    pub attendance: usize,
    pub projects: usize,
    pub votes: usize,
    pub executive_acts: usize,
    pub sources: usize,
    pub summaries: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl SeedReport {
    pub fn count(&self, table: Table) -> usize {
        match table {
            Table::Politicians => self.politicians,
            Table::LegislativeSessions => self.sessions,
            Table::Attendance => self.attendance,
            Table::Projects => self.projects,
            Table::Votes => self.votes,
            Table::ExecutiveActs => self.executive_acts,
            Table::Sources => self.sources,
            Table::Summaries => self.summaries,
        }
    }

    pub fn total(&self) -> usize {
        Table::ALL.iter().map(|t| self.count(*t)).sum()
    }
}

impl OperationReport for SeedReport {
    fn items(&self) -> usize {
        self.total()
    }

    fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }
}

pub struct Seeder<R> {
    config: SeedConfig,
    options: LifecycleOptions,
    rng: R,
}

impl Seeder<StdRng> {
    /// Reproducible attendance and vote outcomes.
    pub fn from_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> Seeder<R> {
    pub fn new(rng: R) -> Self {
        Self {
            config: SeedConfig::default(),
            options: LifecycleOptions::default(),
            rng,
        }
    }

    pub fn with_config(mut self, config: SeedConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_options(mut self, options: LifecycleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &SeedConfig {
        &self.config
    }

    /// Insert the sample dataset. The schema must already be applied.
    pub async fn populate_sample(
        &mut self,
        manager: &ConnectionManager,
    ) -> Result<SeedReport, PortalError> {
        self.config.validate()?;
        let atomic = self.options.atomic;
        run_logged(Operation::Seed, atomic, async {
            let mut conn = manager.acquire().await?;
            let result = self.seed_on(&mut conn, manager.dialect()).await;
            manager.release(conn);
            result
        })
        .await
    }

    async fn seed_on(
        &mut self,
        conn: &mut AnyConnection,
        dialect: Dialect,
    ) -> Result<SeedReport, PortalError> {
        if self.options.atomic {
            let mut tx = conn.begin().await?;
            let report = SeedRun::new(&mut *tx, dialect, &self.config, &mut self.rng)
                .run_all()
                .await?;
            tx.commit().await?;
            Ok(report)
        } else {
            SeedRun::new(conn, dialect, &self.config, &mut self.rng)
                .run_all()
                .await
        }
    }
}

/// A parent row written during this run, kept with the record it was built
/// from so provenance hashes can be computed later.
#[derive(Debug, Clone)]
struct Seeded<Id, Record> {
    id: Id,
    record: Record,
}

/// Ids captured from each parent batch. `None` means the batch has not run.
#[derive(Debug, Default)]
struct SeedState {
    politicians: Option<Vec<Seeded<PoliticianId, NewPolitician>>>,
    sessions: Option<Vec<Seeded<SessionId, NewSession>>>,
    projects: Option<Vec<Seeded<ProjectId, NewProject>>>,
    executive_acts: Option<Vec<Seeded<ExecutiveActId, NewExecutiveAct>>>,
}

fn require<T>(
    captured: &Option<Vec<T>>,
    batch: Table,
    missing: Table,
) -> Result<&[T], PortalError> {
    captured
        .as_deref()
        .ok_or(PortalError::DependencyOrder { batch, missing })
}

/// First `left_n` of `left` crossed with the first `right_n` of `right`.
/// Each pair occurs once as long as the inputs hold distinct items.
fn bounded_pairs<'a, A, B>(
    left: &'a [A],
    right: &'a [B],
    left_n: usize,
    right_n: usize,
) -> impl Iterator<Item = (&'a A, &'a B)> + 'a {
    left.iter()
        .take(left_n)
        .flat_map(move |l| right.iter().take(right_n).map(move |r| (l, r)))
}

fn record_hash<T: Serialize>(record: &T) -> String {
    content_hash(&serde_json::to_vec(record).unwrap_or_default())
}

struct SeedRun<'a, R> {
    conn: &'a mut AnyConnection,
    dialect: Dialect,
    config: &'a SeedConfig,
    rng: &'a mut R,
    state: SeedState,
    report: SeedReport,
}

impl<'a, R: Rng> SeedRun<'a, R> {
    fn new(
        conn: &'a mut AnyConnection,
        dialect: Dialect,
        config: &'a SeedConfig,
        rng: &'a mut R,
    ) -> Self {
        Self {
            conn,
            dialect,
            config,
            rng,
            state: SeedState::default(),
            report: SeedReport::default(),
        }
    }

    async fn run_all(mut self) -> Result<SeedReport, PortalError> {
        info!("Inserting sample data");
        self.politicians().await?;
        self.sessions().await?;
        self.attendance().await?;
        self.projects().await?;
        self.votes().await?;
        self.executive_acts().await?;
        self.sources().await?;
        self.summaries().await?;
        Ok(self.report)
    }

    async fn politicians(&mut self) -> Result<(), PortalError> {
        let mut seeded = Vec::new();
        for record in sample_politicians() {
            let id = Queries::insert_politician(self.conn, self.dialect, &record).await?;
            seeded.push(Seeded { id, record });
        }
        self.report.politicians = seeded.len();
        info!("Created {} politicians", seeded.len());
        self.state.politicians = Some(seeded);
        Ok(())
    }

    async fn sessions(&mut self) -> Result<(), PortalError> {
        let mut seeded = Vec::new();
        for record in sample_sessions() {
            let id = Queries::insert_session(self.conn, self.dialect, &record).await?;
            seeded.push(Seeded { id, record });
        }
        self.report.sessions = seeded.len();
        info!("Created {} legislative sessions", seeded.len());
        self.state.sessions = Some(seeded);
        Ok(())
    }

    async fn attendance(&mut self) -> Result<(), PortalError> {
        let politicians = require(&self.state.politicians, Table::Attendance, Table::Politicians)?;
        let sessions = require(
            &self.state.sessions,
            Table::Attendance,
            Table::LegislativeSessions,
        )?;

        let mut rows = Vec::new();
        for (politician, session) in bounded_pairs(
            politicians,
            sessions,
            self.config.attendance_politicians,
            self.config.attendance_sessions,
        ) {
            let status = if self.rng.gen_bool(self.config.present_probability) {
                AttendanceStatus::Present
            } else {
                AttendanceStatus::Absent
            };
            rows.push(NewAttendance {
                politician_id: politician.id,
                session_id: session.id,
                status,
                notes: None,
            });
        }

        for row in &rows {
            Queries::insert_attendance(self.conn, self.dialect, row).await?;
        }
        self.report.attendance = rows.len();
        info!("Created {} attendance records", rows.len());
        Ok(())
    }

    async fn projects(&mut self) -> Result<(), PortalError> {
        let politicians = require(&self.state.politicians, Table::Projects, Table::Politicians)?;

        // One distinct councilmember per project; extra projects get no author.
        let mut authors = politicians
            .iter()
            .filter(|p| p.record.position == Position::Councilmember)
            .map(|p| p.id);
        let records: Vec<NewProject> = sample_projects()
            .into_iter()
            .map(|project| NewProject {
                author_id: authors.next(),
                ..project
            })
            .collect();

        let mut seeded = Vec::new();
        for record in records {
            let id = Queries::insert_project(self.conn, self.dialect, &record).await?;
            seeded.push(Seeded { id, record });
        }
        self.report.projects = seeded.len();
        info!("Created {} projects", seeded.len());
        self.state.projects = Some(seeded);
        Ok(())
    }

    async fn votes(&mut self) -> Result<(), PortalError> {
        let projects = require(&self.state.projects, Table::Votes, Table::Projects)?;
        let politicians = require(&self.state.politicians, Table::Votes, Table::Politicians)?;

        let mut rows = Vec::new();
        for (project, politician) in bounded_pairs(
            projects,
            politicians,
            self.config.vote_projects,
            self.config.vote_politicians,
        ) {
            let choice = if self.rng.gen_bool(self.config.yes_probability) {
                VoteChoice::Yes
            } else if self.rng.gen_bool(0.5) {
                VoteChoice::No
            } else {
                VoteChoice::Abstain
            };
            rows.push(NewVote {
                project_id: project.id,
                politician_id: politician.id,
                choice,
                notes: None,
            });
        }

        for row in &rows {
            Queries::insert_vote(self.conn, self.dialect, row).await?;
        }
        self.report.votes = rows.len();
        info!("Created {} votes", rows.len());
        Ok(())
    }

    async fn executive_acts(&mut self) -> Result<(), PortalError> {
        let politicians = require(
            &self.state.politicians,
            Table::ExecutiveActs,
            Table::Politicians,
        )?;
        let mayor = politicians
            .iter()
            .find(|p| p.record.position == Position::Mayor)
            .map(|p| p.id);

        let mut seeded = Vec::new();
        for act in sample_executive_acts() {
            let record = NewExecutiveAct {
                author_id: mayor,
                ..act
            };
            let id = Queries::insert_executive_act(self.conn, self.dialect, &record).await?;
            seeded.push(Seeded { id, record });
        }
        self.report.executive_acts = seeded.len();
        info!("Created {} executive acts", seeded.len());
        self.state.executive_acts = Some(seeded);
        Ok(())
    }

    async fn sources(&mut self) -> Result<(), PortalError> {
        let politicians = require(&self.state.politicians, Table::Sources, Table::Politicians)?;
        let projects = require(&self.state.projects, Table::Sources, Table::Projects)?;
        let acts = require(&self.state.executive_acts, Table::Sources, Table::ExecutiveActs)?;

        let provenance = |url: &str, name: &str, entity: EntityRef, hash: String| NewSource {
            entity,
            source_url: url.to_string(),
            source_name: Some(name.to_string()),
            content_hash: Some(hash),
        };
        let rows: Vec<NewSource> = politicians
            .iter()
            .map(|p| {
                provenance(
                    CHAMBER_POLITICIANS_URL,
                    CHAMBER_NAME,
                    EntityRef::Politician(p.id),
                    record_hash(&p.record),
                )
            })
            .chain(projects.iter().map(|p| {
                provenance(
                    CHAMBER_PROJECTS_URL,
                    CHAMBER_NAME,
                    EntityRef::Project(p.id),
                    record_hash(&p.record),
                )
            }))
            .chain(acts.iter().map(|a| {
                provenance(
                    GAZETTE_URL,
                    GAZETTE_NAME,
                    EntityRef::ExecutiveAct(a.id),
                    record_hash(&a.record),
                )
            }))
            .collect();

        for row in &rows {
            Queries::insert_source(self.conn, self.dialect, row).await?;
        }
        self.report.sources = rows.len();
        info!("Created {} source records", rows.len());
        Ok(())
    }

    async fn summaries(&mut self) -> Result<(), PortalError> {
        let projects = require(&self.state.projects, Table::Summaries, Table::Projects)?;
        let politicians = require(&self.state.politicians, Table::Summaries, Table::Politicians)?;
        let reviewer = politicians
            .iter()
            .find(|p| p.record.position == Position::Mayor)
            .map(|p| p.id);

        let rows: Vec<NewSummary> = projects
            .iter()
            .enumerate()
            .map(|(i, project)| NewSummary {
                entity: EntityRef::Project(project.id),
                summary_text: format!(
                    "{} ({}): {}",
                    project.record.title,
                    project.record.project_number,
                    project.record.description.as_deref().unwrap_or_default()
                ),
                generated_by: Some(SUMMARY_GENERATOR.to_string()),
                review: (i == 0).then(|| Review {
                    reviewer,
                    reviewed_at: Utc::now(),
                }),
            })
            .collect();

        for row in &rows {
            Queries::insert_summary(self.conn, self.dialect, row).await?;
        }
        self.report.summaries = rows.len();
        info!("Created {} summaries", rows.len());
        Ok(())
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

fn sample_politicians() -> Vec<NewPolitician> {
    let councilmember = |name: &str, party: &str, email: &str, phone: &str| NewPolitician {
        name: name.to_string(),
        position: Position::Councilmember,
        party: Some(party.to_string()),
        email: Some(email.to_string()),
        phone: Some(phone.to_string()),
        photo_url: None,
        birth_date: None,
        is_active: true,
    };
    vec![
        councilmember("Helena Duarte", "PSDB", "helena.duarte@camara.example", "(13) 99810-1101"),
        councilmember("Marcos Vieira", "PT", "marcos.vieira@camara.example", "(13) 99810-1102"),
        councilmember("Lúcia Andrade", "MDB", "lucia.andrade@camara.example", "(13) 99810-1103"),
        councilmember("Paulo Teixeira", "PSB", "paulo.teixeira@camara.example", "(13) 99810-1104"),
        councilmember("Renata Campos", "PDT", "renata.campos@camara.example", "(13) 99810-1105"),
        NewPolitician {
            name: "Eduardo Moreira".to_string(),
            position: Position::Mayor,
            party: Some("PSD".to_string()),
            email: Some("gabinete@prefeitura.example".to_string()),
            phone: Some("(13) 99810-1000".to_string()),
            photo_url: None,
            birth_date: Some(date(1968, 3, 14)),
            is_active: true,
        },
    ]
}

fn sample_sessions() -> Vec<NewSession> {
    fn session(
        number: &str,
        on: NaiveDate,
        kind: &str,
        status: SessionStatus,
        description: &str,
    ) -> NewSession {
        NewSession {
            session_number: number.to_string(),
            session_date: on,
            session_type: Some(kind.to_string()),
            status,
            description: Some(description.to_string()),
            source_url: None,
        }
    }
    const ORDINARY: &str = "Ordinary chamber session";
    vec![
        session("001/2025", date(2025, 1, 15), "ordinary", SessionStatus::Completed, ORDINARY),
        session("002/2025", date(2025, 1, 22), "ordinary", SessionStatus::Completed, ORDINARY),
        session("003/2025", date(2025, 2, 5), "ordinary", SessionStatus::Scheduled, ORDINARY),
        session(
            "004/2025",
            date(2025, 2, 19),
            "extraordinary",
            SessionStatus::Scheduled,
            "Extraordinary session for a special vote",
        ),
    ]
}

/// Authors are filled in by the seeder once politician ids exist.
fn sample_projects() -> Vec<NewProject> {
    fn project(
        number: &str,
        title: &str,
        description: &str,
        status: ProjectStatus,
        kind: &str,
        on: NaiveDate,
        theme: &str,
    ) -> NewProject {
        NewProject {
            project_number: number.to_string(),
            author_id: None,
            title: title.to_string(),
            description: Some(description.to_string()),
            status,
            project_type: Some(kind.to_string()),
            presentation_date: Some(on),
            theme: Some(theme.to_string()),
            source_url: None,
        }
    }
    vec![
        project(
            "PL-001/2025",
            "Mangrove Protection Act",
            "Extends environmental protection to the municipal mangrove areas",
            ProjectStatus::InProgress,
            "bill",
            date(2025, 1, 10),
            "environment",
        ),
        project(
            "PL-002/2025",
            "Public Health Outreach Program",
            "Expands the municipal public health program to every district",
            ProjectStatus::Approved,
            "bill",
            date(2025, 1, 12),
            "health",
        ),
        project(
            "PL-003/2025",
            "School Infrastructure Renewal",
            "Modernises municipal school buildings and equipment",
            ProjectStatus::InProgress,
            "bill",
            date(2025, 1, 14),
            "education",
        ),
        project(
            "MOC-001/2025",
            "Motion of Recognition",
            "Recognises the local university for its community work",
            ProjectStatus::Submitted,
            "motion",
            date(2025, 1, 16),
            "education",
        ),
    ]
}

/// Authored by the mayor once the politician batch has run.
fn sample_executive_acts() -> Vec<NewExecutiveAct> {
    fn act(
        number: &str,
        act_type: ActType,
        title: &str,
        description: &str,
        on: NaiveDate,
    ) -> NewExecutiveAct {
        NewExecutiveAct {
            act_number: number.to_string(),
            act_type,
            author_id: None,
            title: title.to_string(),
            description: Some(description.to_string()),
            publication_date: on,
            source_url: None,
        }
    }
    vec![
        act(
            "DECREE-001/2025",
            ActType::Decree,
            "Administrative Reorganisation Decree",
            "Reorganises the municipal public administration",
            date(2025, 1, 8),
        ),
        act(
            "ORDINANCE-001/2025",
            ActType::Ordinance,
            "Appointment Ordinance",
            "Appoints new municipal civil servants",
            date(2025, 1, 9),
        ),
        act(
            "DECREE-002/2025",
            ActType::Decree,
            "Health Funding Decree",
            "Allocates additional resources to public health",
            date(2025, 1, 13),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_bounded_pairs_never_repeat() {
        let left = [1, 2, 3, 4, 5, 6];
        let right = ['a', 'b', 'c', 'd'];
        let pairs: Vec<_> = bounded_pairs(&left, &right, 5, 2).collect();
        assert_eq!(pairs.len(), 10);
        let distinct: HashSet<_> = pairs.iter().collect();
        assert_eq!(distinct.len(), pairs.len());

        // Bounds larger than the inputs are clamped by the inputs.
        assert_eq!(bounded_pairs(&left, &right, 10, 10).count(), 24);
        assert_eq!(bounded_pairs(&left, &right, 0, 3).count(), 0);
    }

    #[test]
    fn test_fixture_shape() {
        let politicians = sample_politicians();
        assert_eq!(politicians.len(), 6);
        assert_eq!(
            politicians.iter().filter(|p| p.position == Position::Mayor).count(),
            1
        );
        assert_eq!(sample_sessions().len(), 4);
        assert_eq!(sample_projects().len(), 4);
        assert_eq!(sample_executive_acts().len(), 3);

        let statuses: HashSet<_> = sample_sessions().iter().map(|s| s.status).collect();
        assert!(statuses.contains(&SessionStatus::Scheduled));
        assert!(statuses.contains(&SessionStatus::Completed));

        let numbers: HashSet<_> = sample_projects().into_iter().map(|p| p.project_number).collect();
        assert_eq!(numbers.len(), 4);
    }

    #[test]
    fn test_config_validation() {
        assert!(SeedConfig::default().validate().is_ok());
        let config = SeedConfig {
            present_probability: 1.5,
            ..SeedConfig::default()
        };
        assert!(matches!(config.validate(), Err(PortalError::Config(_))));
    }

    #[test]
    fn test_config_bounds() {
        let config = SeedConfig::default();
        assert_eq!(config.max_attendance(6, 4), 10);
        assert_eq!(config.max_votes(4, 6), 10);
        assert_eq!(config.max_attendance(3, 1), 3);
    }

    #[tokio::test]
    async fn test_child_batches_require_parent_ids() {
        let manager = ConnectionManager::in_memory().unwrap();
        let mut conn = manager.acquire().await.unwrap();
        let config = SeedConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut run = SeedRun::new(&mut conn, manager.dialect(), &config, &mut rng);

        let err = run.attendance().await.unwrap_err();
        assert!(matches!(
            err,
            PortalError::DependencyOrder {
                batch: Table::Attendance,
                missing: Table::Politicians
            }
        ));

        let err = run.votes().await.unwrap_err();
        assert!(matches!(
            err,
            PortalError::DependencyOrder {
                batch: Table::Votes,
                missing: Table::Projects
            }
        ));

        let err = run.sources().await.unwrap_err();
        assert!(matches!(err, PortalError::DependencyOrder { batch: Table::Sources, .. }));
    }
}
