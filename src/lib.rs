pub mod config;
pub mod database;
pub mod error;
pub mod lifecycle;

pub use config::DatabaseConfig;
pub use database::{ConnectionManager, Dialect};
pub use error::PortalError;
pub use lifecycle::{LifecycleOptions, Migrator, Resetter, SeedConfig, Seeder};
