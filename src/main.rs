//! # Status Page Main Entry Point

use anyhow::Context;
use migration::{Migrator, MigratorTrait};
use statuspage::{config::ConfigLoader, db, server::run_server, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new()
        .load()
        .context("Failed to load configuration")?;

    telemetry::init_tracing(&config).context("Failed to initialize tracing")?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let db = db::init_pool(&config).await?;

    if config.run_migrations {
        Migrator::up(&db, None)
            .await
            .context("Failed to apply database migrations")?;
        tracing::info!("Database migrations applied");
    }

    run_server(config, db).await
}
