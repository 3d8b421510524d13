//! Storage factory for runtime backend selection

use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::domain::application::ApplicationRepository;
use crate::domain::DomainError;
use crate::infrastructure::application::{
    InMemoryApplicationRepository, PostgresApplicationRepository,
};

use super::migrations::run_migrations;
use super::postgres::{connect, PostgresConfig};

/// Supported storage types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// PostgreSQL storage
    Postgres,
}

impl FromStr for StorageType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Ok(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(DomainError::configuration(format!(
                "Unknown storage backend '{}'",
                other
            ))),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// In-memory storage configuration
    InMemory,
    /// PostgreSQL storage configuration
    Postgres(PostgresConfig),
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn postgres(config: PostgresConfig) -> Self {
        Self::Postgres(config)
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Postgres(_) => StorageType::Postgres,
        }
    }
}

/// Factory for application repositories
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Creates the repository selected by the configuration.
    ///
    /// For PostgreSQL this connects the pool and applies pending migrations.
    pub async fn create_application_repository(
        config: &StorageConfig,
    ) -> Result<Arc<dyn ApplicationRepository>, DomainError> {
        match config {
            StorageConfig::InMemory => {
                info!("Using in-memory application storage");
                Ok(Arc::new(InMemoryApplicationRepository::new()))
            }
            StorageConfig::Postgres(pg_config) => {
                info!("Using PostgreSQL application storage");
                let pool = connect(pg_config).await?;
                run_migrations(&pool).await?;
                Ok(Arc::new(PostgresApplicationRepository::new(pool)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_from_str() {
        assert_eq!("memory".parse::<StorageType>().unwrap(), StorageType::InMemory);
        assert_eq!("in-memory".parse::<StorageType>().unwrap(), StorageType::InMemory);
        assert_eq!("Postgres".parse::<StorageType>().unwrap(), StorageType::Postgres);
        assert_eq!("pg".parse::<StorageType>().unwrap(), StorageType::Postgres);

        let unknown = "redis".parse::<StorageType>();
        assert!(matches!(unknown, Err(DomainError::Configuration { .. })));
    }

    #[test]
    fn test_storage_config_types() {
        assert_eq!(StorageConfig::in_memory().storage_type(), StorageType::InMemory);
        assert_eq!(
            StorageConfig::postgres(PostgresConfig::new("postgres://localhost/test")).storage_type(),
            StorageType::Postgres
        );
    }

    #[tokio::test]
    async fn test_create_in_memory_repository() {
        let repo = StorageFactory::create_application_repository(&StorageConfig::in_memory())
            .await
            .unwrap();

        assert!(repo.list().await.unwrap().is_empty());
    }
}
