use anyhow::{Context, Result};
use clap::Parser;
use migration::{Migrator, MigratorTrait};
use statuspage::{config::ConfigLoader, db, seeds, telemetry};

/// Seed the database with a demo organization
#[derive(Debug, Parser)]
#[command(name = "seed", version)]
struct Args {
    /// Drop every table and re-run migrations before seeding
    #[arg(long)]
    reset: bool,

    /// Identity-provider key for the demo organization
    #[arg(long, default_value = seeds::DEMO_EXTERNAL_ID)]
    external_id: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config).context("initializing tracing")?;

    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;

    if args.reset {
        Migrator::fresh(&db).await.context("resetting database")?;
        tracing::warn!("Database reset");
    } else {
        Migrator::up(&db, None).await.context("applying migrations")?;
    }

    let summary = seeds::seed_demo(&db, &args.external_id).await?;
    tracing::info!(
        organizations = summary.organizations,
        services = summary.services,
        incidents = summary.incidents,
        incident_updates = summary.incident_updates,
        maintenances = summary.maintenances,
        members = summary.members,
        "Seeding complete"
    );

    Ok(())
}
