//! Database migrations infrastructure

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use tracing::info;

use crate::domain::DomainError;

/// Trait for running database migrations
#[async_trait]
pub trait Migrator: Send + Sync {
    /// Runs all pending migrations
    async fn run(&self) -> Result<(), DomainError>;

    /// Reverts the last applied migration
    async fn revert(&self) -> Result<(), DomainError>;

    /// Returns the current migration version
    async fn version(&self) -> Result<Option<i64>, DomainError>;
}

/// PostgreSQL migrator tracking applied versions in `_migrations`
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
    migrations: Vec<Migration>,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool, migrations: Vec<Migration>) -> Self {
        Self { pool, migrations }
    }

    /// Creates the migrations table if it doesn't exist
    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                success BOOLEAN NOT NULL DEFAULT TRUE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| migration_error("create migrations table", e))?;

        Ok(())
    }

    async fn is_applied(&self, version: i64) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)")
            .bind(version)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| migration_error("check migration status", e))
    }

    /// Runs a single migration inside a transaction
    ///
    /// `up` and `down` must each hold one SQL statement.
    pub async fn run_migration(&self, migration: &Migration) -> Result<(), DomainError> {
        self.ensure_migrations_table().await?;

        if self.is_applied(migration.version).await? {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| migration_error("begin transaction", e))?;

        sqlx::query(&migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|e| migration_error(&format!("run migration {}", migration.version), e))?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(&migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| migration_error(&format!("record migration {}", migration.version), e))?;

        tx.commit()
            .await
            .map_err(|e| migration_error("commit migration", e))?;

        info!(version = migration.version, description = %migration.description, "Applied migration");
        Ok(())
    }

    /// Reverts a single migration inside a transaction
    pub async fn revert_migration(&self, migration: &Migration) -> Result<(), DomainError> {
        self.ensure_migrations_table().await?;

        if !self.is_applied(migration.version).await? {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| migration_error("begin transaction", e))?;

        sqlx::query(&migration.down)
            .execute(&mut *tx)
            .await
            .map_err(|e| migration_error(&format!("revert migration {}", migration.version), e))?;

        sqlx::query("DELETE FROM _migrations WHERE version = $1")
            .bind(migration.version)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                migration_error(&format!("remove migration record {}", migration.version), e)
            })?;

        tx.commit()
            .await
            .map_err(|e| migration_error("commit revert", e))?;

        info!(version = migration.version, "Reverted migration");
        Ok(())
    }
}

#[async_trait]
impl Migrator for PostgresMigrator {
    async fn run(&self) -> Result<(), DomainError> {
        for migration in &self.migrations {
            self.run_migration(migration).await?;
        }

        Ok(())
    }

    async fn revert(&self) -> Result<(), DomainError> {
        let Some(version) = self.version().await? else {
            info!("No migrations to revert");
            return Ok(());
        };

        match self.migrations.iter().find(|m| m.version == version) {
            Some(migration) => self.revert_migration(migration).await,
            None => Err(DomainError::persistence(format!(
                "Applied migration {} is unknown to this build",
                version
            ))),
        }
    }

    async fn version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT MAX(version) FROM _migrations WHERE success = TRUE")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| migration_error("get migration version", e))
    }
}

/// Represents a database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version, ascending
    pub version: i64,
    /// Human-readable description
    pub description: String,
    /// SQL to run when applying the migration
    pub up: String,
    /// SQL to run when reverting the migration
    pub down: String,
}

impl Migration {
    pub fn new(
        version: i64,
        description: impl Into<String>,
        up: impl Into<String>,
        down: impl Into<String>,
    ) -> Self {
        Self {
            version,
            description: description.into(),
            up: up.into(),
            down: down.into(),
        }
    }
}

/// Schema for the application registry
pub fn application_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create applications table",
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id TEXT PRIMARY KEY,
                app_name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                owners TEXT NOT NULL DEFAULT '',
                team_name TEXT NOT NULL DEFAULT '',
                api_key TEXT NOT NULL UNIQUE,
                is_valid BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            "#,
            r#"
            DROP TABLE IF EXISTS applications;
            "#,
        ),
        Migration::new(
            2,
            "Index applications by registration time",
            r#"
            CREATE INDEX IF NOT EXISTS idx_applications_created_at
                ON applications(created_at, id);
            "#,
            r#"
            DROP INDEX IF EXISTS idx_applications_created_at;
            "#,
        ),
    ]
}

/// Runs all pending application migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    PostgresMigrator::new(pool.clone(), application_migrations())
        .run()
        .await
}

fn migration_error(operation: &str, e: sqlx::Error) -> DomainError {
    DomainError::persistence(format!("Failed to {}: {}", operation, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creation() {
        let migration = Migration::new(1, "Test migration", "CREATE TABLE test", "DROP TABLE test");

        assert_eq!(migration.version, 1);
        assert_eq!(migration.description, "Test migration");
        assert_eq!(migration.up, "CREATE TABLE test");
        assert_eq!(migration.down, "DROP TABLE test");
    }

    #[test]
    fn test_application_migrations_ascending() {
        let migrations = application_migrations();

        assert!(!migrations.is_empty());
        assert!(
            migrations
                .windows(2)
                .all(|pair| pair[1].version > pair[0].version),
            "Migrations should be in ascending order"
        );
    }

    #[test]
    fn test_applications_table_enforces_uniqueness() {
        let create = &application_migrations()[0].up;

        assert!(create.contains("id TEXT PRIMARY KEY"));
        assert!(create.contains("api_key TEXT NOT NULL UNIQUE"));
        assert!(create.contains("is_valid BOOLEAN NOT NULL DEFAULT TRUE"));
    }

    #[test]
    fn test_each_migration_is_a_single_statement() {
        // statements run as prepared queries, which accept one statement each
        for migration in application_migrations() {
            for sql in [&migration.up, &migration.down] {
                let body = sql.trim().trim_end_matches(';');
                assert!(!body.contains(';'), "migration {} has several statements", migration.version);
            }
        }
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_migration_futures_are_send() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/ods_registry")
            .unwrap();
        let migrator = PostgresMigrator::new(pool, application_migrations());
        let migration = &application_migrations()[0];

        assert_send(&migrator.run_migration(migration));
        assert_send(&migrator.revert_migration(migration));
        assert_send(&migrator.run());
        assert_send(&migrator.revert());
    }

    #[test]
    fn test_every_migration_can_be_reverted() {
        for migration in application_migrations() {
            assert!(!migration.description.is_empty());
            assert!(!migration.up.trim().is_empty());
            assert!(!migration.down.trim().is_empty());
        }
    }
}
