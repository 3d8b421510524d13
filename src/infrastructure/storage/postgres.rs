//! PostgreSQL connection pooling

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

use crate::domain::DomainError;

/// PostgreSQL connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
    /// Server-side `statement_timeout` in milliseconds, unset keeps the server default
    pub statement_timeout_ms: Option<u64>,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/ods_registry".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            statement_timeout_ms: None,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }

    /// Have the server cancel statements running longer than `ms`
    pub fn with_statement_timeout(mut self, ms: u64) -> Self {
        self.statement_timeout_ms = Some(ms);
        self
    }

    /// Parse the URL and apply per-connection session settings
    pub fn connect_options(&self) -> Result<PgConnectOptions, DomainError> {
        let options = PgConnectOptions::from_str(&self.url).map_err(|e| {
            DomainError::configuration(format!("Invalid PostgreSQL URL: {}", e))
        })?;

        Ok(match self.statement_timeout_ms {
            Some(ms) => options.options([("statement_timeout", ms.to_string())]),
            None => options,
        })
    }
}

/// Open a connection pool
pub async fn connect(config: &PostgresConfig) -> Result<PgPool, DomainError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect_with(config.connect_options()?)
        .await
        .map_err(|e| {
            DomainError::store_unavailable(format!("Failed to connect to PostgreSQL: {}", e))
        })?;

    info!(
        max_connections = config.max_connections,
        statement_timeout_ms = config.statement_timeout_ms,
        "Connected to PostgreSQL"
    );

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_config_defaults() {
        let config = PostgresConfig::new("postgres://db/registry");

        assert_eq!(config.url, "postgres://db/registry");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.idle_timeout_secs, 600);
        assert_eq!(config.statement_timeout_ms, None);
    }

    #[test]
    fn test_postgres_config_builder() {
        let config = PostgresConfig::new("postgres://db/registry")
            .with_max_connections(20)
            .with_min_connections(2)
            .with_connect_timeout(5)
            .with_idle_timeout(60);

        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(config.idle_timeout_secs, 60);
    }

    #[test]
    fn test_statement_timeout_is_sent_as_session_option() {
        let options = PostgresConfig::new("postgres://db/registry")
            .with_statement_timeout(5000)
            .connect_options()
            .unwrap();

        let session = options.get_options().unwrap_or_default();
        assert!(session.contains("statement_timeout=5000"));
    }

    #[test]
    fn test_no_statement_timeout_by_default() {
        let options = PostgresConfig::new("postgres://db/registry")
            .connect_options()
            .unwrap();

        assert!(options.get_options().is_none());
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_url() {
        let config = PostgresConfig::new("not-a-url").with_connect_timeout(1);

        let result = connect(&config).await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
