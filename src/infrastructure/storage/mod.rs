//! Storage infrastructure - backend selection, connection pooling and schema

mod factory;
pub mod migrations;
mod postgres;

pub use factory::{StorageConfig, StorageFactory, StorageType};
pub use migrations::{application_migrations, run_migrations, Migration, Migrator, PostgresMigrator};
pub use postgres::{connect, PostgresConfig};
