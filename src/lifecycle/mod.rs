//! Schema lifecycle operations
//!
//! Migrate, reset and seed each take one connection from the
//! [`ConnectionManager`](crate::database::ConnectionManager), run a strictly
//! ordered list of statements on it and hand it back. None of them retries
//! or rolls back on failure unless atomic mode is requested; they are meant
//! to be re-run by an operator once the cause is fixed.

pub mod migrate;
pub mod reset;
pub mod seed;

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::error::PortalError;

pub use migrate::{MigrationReport, Migrator};
pub use reset::{ResetReport, Resetter};
pub use seed::{SeedConfig, SeedReport, Seeder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Migrate,
    Reset,
    Seed,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Migrate => "migrate",
            Operation::Reset => "reset",
            Operation::Seed => "seed",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knobs shared by every lifecycle operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleOptions {
    /// Run the whole operation inside one transaction and roll back on
    /// error. Off by default: statements are applied one by one and a
    /// failure leaves earlier statements in place.
    pub atomic: bool,
}

/// Implemented by operation reports so the success event can carry counts.
pub trait OperationReport {
    /// Number of objects created, dropped or inserted.
    fn items(&self) -> usize;

    fn set_elapsed(&mut self, elapsed: Duration);
}

/// Wraps an operation with `lifecycle.start` / `lifecycle.success` /
/// `lifecycle.failure` events.
pub(crate) async fn run_logged<T, F>(
    operation: Operation,
    atomic: bool,
    work: F,
) -> Result<T, PortalError>
where
    T: OperationReport,
    F: Future<Output = Result<T, PortalError>>,
{
    let started = Instant::now();
    info!(
        event = "lifecycle.start",
        operation = operation.as_str(),
        atomic,
        "Starting {}",
        operation
    );

    match work.await {
        Ok(mut report) => {
            let elapsed = started.elapsed();
            report.set_elapsed(elapsed);
            info!(
                event = "lifecycle.success",
                operation = operation.as_str(),
                items = report.items(),
                elapsed_ms = elapsed.as_millis() as u64,
                "{} completed",
                operation
            );
            Ok(report)
        }
        Err(err) => {
            error!(
                event = "lifecycle.failure",
                operation = operation.as_str(),
                error_kind = err.kind(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "{} failed: {}",
                operation,
                err
            );
            Err(err)
        }
    }
}
