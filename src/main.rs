//! Portal Cívico database operator tool
//!
//! Applies the schema, wipes it, and loads sample data into the store named
//! by `DATABASE_URL` (or the composed `DB_*` settings).

use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use portal_db::database::queries::Queries;
use portal_db::database::schema::{self, Table};
use portal_db::{
    ConnectionManager, DatabaseConfig, Dialect, LifecycleOptions, Migrator, PortalError, Resetter,
    Seeder,
};

#[derive(Parser, Debug)]
#[command(name = "portal-db")]
#[command(about = "Manage the Portal Cívico database schema and sample data")]
struct Cli {
    /// Connection URL; overrides DATABASE_URL and the DB_* settings
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Log level for this crate when RUST_LOG is not set
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create every table and index that does not exist yet
    Migrate {
        #[command(flatten)]
        lifecycle: LifecycleArgs,
    },
    /// Drop every portal table
    Reset {
        /// Confirm that all data will be lost
        #[arg(long)]
        yes: bool,

        #[command(flatten)]
        lifecycle: LifecycleArgs,
    },
    /// Insert the sample dataset
    Seed {
        /// Seed for attendance and vote outcomes
        #[arg(long)]
        rng_seed: Option<u64>,

        #[command(flatten)]
        lifecycle: LifecycleArgs,
    },
    /// Reset, migrate and seed in one go
    Setup {
        #[arg(long)]
        rng_seed: Option<u64>,

        #[command(flatten)]
        lifecycle: LifecycleArgs,
    },
    /// Check connectivity and print row counts
    Status,
    /// Print the schema definition script
    Script {
        #[arg(short, long, default_value = "postgres")]
        dialect: String,
    },
}

#[derive(Args, Debug, Clone, Copy)]
struct LifecycleArgs {
    /// Run inside one transaction and roll back on error
    #[arg(long)]
    atomic: bool,
}

impl From<LifecycleArgs> for LifecycleOptions {
    fn from(args: LifecycleArgs) -> Self {
        LifecycleOptions { atomic: args.atomic }
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("portal_db={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Printing DDL never touches the store.
    if let Commands::Script { dialect } = &cli.command {
        let dialect =
            Dialect::parse(dialect).with_context(|| format!("Unknown dialect {:?}", dialect))?;
        println!("{}", schema::definition_script(dialect));
        return Ok(());
    }
    if let Commands::Reset { yes: false, .. } = &cli.command {
        warn!("reset drops every portal table and all of its data");
        bail!("Refusing to reset without --yes");
    }

    let config = match &cli.database_url {
        Some(url) => DatabaseConfig::from_url(url),
        None => DatabaseConfig::load().context("Failed to load database configuration")?,
    };
    info!("Using store {}", config.redacted_url());
    let manager = ConnectionManager::connect(&config)?;

    let result = execute(&manager, cli.command).await;
    manager.shutdown().await;
    result
}

async fn execute(manager: &ConnectionManager, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Migrate { lifecycle } => {
            let report = Migrator::with_options(lifecycle.into()).apply_schema(manager).await?;
            println!(
                "Schema applied: {} tables, {} indexes ({} ms)",
                report.tables,
                report.indexes,
                report.elapsed.as_millis()
            );
        }
        Commands::Reset { lifecycle, .. } => {
            let report = Resetter::with_options(lifecycle.into()).reset_all(manager).await?;
            println!("Dropped {} tables", report.tables.len());
        }
        Commands::Seed { rng_seed, lifecycle } => {
            seed(manager, rng_seed, lifecycle.into()).await?;
        }
        Commands::Setup { rng_seed, lifecycle } => {
            let options = LifecycleOptions::from(lifecycle);
            Resetter::with_options(options)
                .reset_all(manager)
                .await
                .context("Reset step failed")?;
            Migrator::with_options(options)
                .apply_schema(manager)
                .await
                .context("Migrate step failed")?;
            seed(manager, rng_seed, options)
                .await
                .context("Seed step failed")?;
        }
        Commands::Status => status(manager).await?,
        Commands::Script { .. } => {}
    }
    Ok(())
}

async fn seed(
    manager: &ConnectionManager,
    rng_seed: Option<u64>,
    options: LifecycleOptions,
) -> anyhow::Result<()> {
    let mut seeder = match rng_seed {
        Some(seed) => Seeder::from_seed(seed),
        None => Seeder::from_entropy(),
    }
    .with_options(options);

    let report = seeder.populate_sample(manager).await?;
    for table in Table::ALL {
        println!("{:<22} {}", table.name(), report.count(table));
    }
    println!("Inserted {} rows", report.total());
    Ok(())
}

async fn status(manager: &ConnectionManager) -> anyhow::Result<()> {
    let mut conn = manager.acquire().await?;
    let result = async {
        let probe = manager.probe(&mut conn).await?;
        let counts = Queries::table_counts(&mut conn, manager.dialect()).await?;
        Ok::<_, PortalError>((probe, counts))
    }
    .await;
    manager.release(conn);

    let (probe, counts) = result?;
    println!("Server: {}", probe.server_version);
    println!("Time:   {}", probe.server_time);
    for (table, rows) in counts {
        match rows {
            Some(rows) => println!("{:<22} {}", table.name(), rows),
            None => println!("{:<22} (missing)", table.name()),
        }
    }
    Ok(())
}
