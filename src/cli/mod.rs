//! CLI module for the ODS application registry
//!
//! - `serve`: run the HTTP API (default deployment mode)
//! - `migrate`: apply or revert the PostgreSQL schema

pub mod migrate;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// ODS Application Registry - issues application IDs and API keys
#[derive(Debug, Parser)]
#[command(name = "ods-registry")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Apply pending database migrations
    Migrate(migrate::MigrateArgs),
}

/// Load `.env`, configuration and the log subscriber shared by every command
pub(crate) fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["ods-registry", "serve"]).unwrap();
        assert!(matches!(cli.command, Command::Serve));
    }

    #[test]
    fn test_parse_migrate_revert() {
        let cli = Cli::try_parse_from(["ods-registry", "migrate", "--revert"]).unwrap();
        match cli.command {
            Command::Migrate(args) => assert!(args.revert),
            other => panic!("Expected migrate, got {:?}", other),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["ods-registry"]).is_err());
    }
}
