//! Migrate command - applies or reverts the PostgreSQL schema

use anyhow::bail;
use clap::Args;
use tracing::info;

use crate::infrastructure::storage::{
    application_migrations, connect, Migrator, PostgresMigrator, StorageConfig,
};

#[derive(Debug, Clone, Args)]
pub struct MigrateArgs {
    /// Revert the most recently applied migration instead
    #[arg(long)]
    pub revert: bool,
}

pub async fn run(args: MigrateArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;

    let StorageConfig::Postgres(pg_config) = config.storage.to_storage_config()? else {
        bail!("Migrations require storage.backend = \"postgres\"");
    };

    let pool = connect(&pg_config).await?;
    let migrator = PostgresMigrator::new(pool, application_migrations());

    if args.revert {
        migrator.revert().await?;
    } else {
        migrator.run().await?;
    }

    let version = migrator.version().await?;
    info!(version = ?version, "Schema is at version");

    Ok(())
}
