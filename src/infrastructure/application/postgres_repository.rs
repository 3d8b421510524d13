//! PostgreSQL application repository implementation

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::application::{
    Application, ApplicationDetails, ApplicationId, ApplicationRepository, ApplicationUpdate,
    UniqueColumn, UniquenessOracle,
};
use crate::domain::DomainError;

/// SQLSTATE raised by PostgreSQL on a unique constraint violation
const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE raised when `statement_timeout` cancels a statement
const QUERY_CANCELED: &str = "57014";

const APPLICATION_COLUMNS: &str = "id, app_name, description, owners, team_name, api_key, is_valid";

const INSERT_APPLICATION: &str = r#"
    INSERT INTO applications (id, app_name, description, owners, team_name, api_key, is_valid)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
"#;

/// Absent fields bind as NULL and keep the stored value
const UPDATE_DETAILS: &str = r#"
    UPDATE applications
    SET app_name = COALESCE($2, app_name),
        description = COALESCE($3, description),
        owners = COALESCE($4, owners),
        team_name = COALESCE($5, team_name)
    WHERE id = $1
"#;

const UPDATE_API_KEY: &str = "UPDATE applications SET api_key = $2 WHERE id = $1 AND is_valid";

const EXISTS_BY_ID: &str = "SELECT EXISTS(SELECT 1 FROM applications WHERE id = $1)";
const EXISTS_BY_API_KEY: &str = "SELECT EXISTS(SELECT 1 FROM applications WHERE api_key = $1)";

/// PostgreSQL implementation of ApplicationRepository
#[derive(Debug, Clone)]
pub struct PostgresApplicationRepository {
    pool: PgPool,
}

impl PostgresApplicationRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(
        &self,
        query: &str,
        value: &str,
        operation: &str,
    ) -> Result<Option<Application>, DomainError> {
        let row = sqlx::query(query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| read_error(operation, e))?;

        row.as_ref().map(row_to_application).transpose()
    }
}

#[async_trait]
impl UniquenessOracle for PostgresApplicationRepository {
    async fn is_taken(&self, column: UniqueColumn, value: &str) -> Result<bool, DomainError> {
        let query = match column {
            UniqueColumn::Id => EXISTS_BY_ID,
            UniqueColumn::ApiKey => EXISTS_BY_API_KEY,
        };

        sqlx::query_scalar::<_, bool>(query)
            .bind(value)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| read_error("check uniqueness", e))
    }
}

#[async_trait]
impl ApplicationRepository for PostgresApplicationRepository {
    async fn insert(&self, application: Application) -> Result<Application, DomainError> {
        sqlx::query(INSERT_APPLICATION)
            .bind(application.id().as_str())
            .bind(application.name())
            .bind(application.description())
            .bind(application.owners())
            .bind(application.team_name())
            .bind(application.api_key())
            .bind(application.is_valid())
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("insert application", e))?;

        Ok(application)
    }

    async fn get(&self, id: &ApplicationId) -> Result<Option<Application>, DomainError> {
        let query = format!("SELECT {} FROM applications WHERE id = $1", APPLICATION_COLUMNS);
        self.fetch_one_by(&query, id.as_str(), "get application")
            .await
    }

    async fn get_by_api_key(&self, api_key: &str) -> Result<Option<Application>, DomainError> {
        let query = format!(
            "SELECT {} FROM applications WHERE api_key = $1",
            APPLICATION_COLUMNS
        );
        self.fetch_one_by(&query, api_key, "get application by API key")
            .await
    }

    async fn list(&self) -> Result<Vec<Application>, DomainError> {
        let query = format!(
            "SELECT {} FROM applications ORDER BY created_at, id",
            APPLICATION_COLUMNS
        );

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| read_error("list applications", e))?;

        rows.iter().map(row_to_application).collect()
    }

    async fn update_details(
        &self,
        id: &ApplicationId,
        update: &ApplicationUpdate,
    ) -> Result<Option<Application>, DomainError> {
        let query = format!("{} RETURNING {}", UPDATE_DETAILS, APPLICATION_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id.as_str())
            .bind(update.name.as_deref())
            .bind(update.description.as_deref())
            .bind(update.owners.as_deref())
            .bind(update.team_name.as_deref())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error("update application", e))?;

        row.as_ref().map(row_to_application).transpose()
    }

    async fn update_api_key(
        &self,
        id: &ApplicationId,
        api_key: &str,
    ) -> Result<Option<Application>, DomainError> {
        let query = format!("{} RETURNING {}", UPDATE_API_KEY, APPLICATION_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id.as_str())
            .bind(api_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error("update API key", e))?;

        row.as_ref().map(row_to_application).transpose()
    }

    async fn revoke(&self, id: &ApplicationId) -> Result<Option<Application>, DomainError> {
        let query = format!(
            "UPDATE applications SET is_valid = FALSE WHERE id = $1 RETURNING {}",
            APPLICATION_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error("revoke application", e))?;

        row.as_ref().map(row_to_application).transpose()
    }

    async fn delete(&self, id: &ApplicationId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("delete application", e))?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_application(row: &PgRow) -> Result<Application, DomainError> {
    let decode = |e: sqlx::Error| DomainError::persistence(format!("Failed to decode row: {}", e));

    let details = ApplicationDetails {
        name: row.try_get("app_name").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        owners: row.try_get("owners").map_err(decode)?,
        team_name: row.try_get("team_name").map_err(decode)?,
    };

    Ok(Application::restore(
        ApplicationId::new(row.try_get::<String, _>("id").map_err(decode)?),
        row.try_get::<String, _>("api_key").map_err(decode)?,
        details,
        row.try_get("is_valid").map_err(decode)?,
    ))
}

/// Whether the failure is the connection or pool rather than the statement
fn is_connectivity_error(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

fn is_statement_timeout(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(QUERY_CANCELED),
        _ => false,
    }
}

fn read_error(operation: &str, e: sqlx::Error) -> DomainError {
    DomainError::store_unavailable(format!("Failed to {}: {}", operation, e))
}

fn write_error(operation: &str, e: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let column = column_for_constraint(db_err.constraint());
            return DomainError::conflict(
                column,
                format!("Failed to {}: duplicate {}", operation, column),
            );
        }
    }

    if is_connectivity_error(&e) || is_statement_timeout(&e) {
        DomainError::store_unavailable(format!("Failed to {}: {}", operation, e))
    } else {
        DomainError::persistence(format!("Failed to {}: {}", operation, e))
    }
}

/// Map a violated constraint name (`applications_pkey`,
/// `applications_api_key_key`) to its column
fn column_for_constraint(constraint: Option<&str>) -> UniqueColumn {
    match constraint {
        Some(name) if name.contains("api_key") => UniqueColumn::ApiKey,
        _ => UniqueColumn::Id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_for_constraint() {
        assert_eq!(
            column_for_constraint(Some("applications_api_key_key")),
            UniqueColumn::ApiKey
        );
        assert_eq!(
            column_for_constraint(Some("applications_pkey")),
            UniqueColumn::Id
        );
        assert_eq!(column_for_constraint(None), UniqueColumn::Id);
    }

    #[test]
    fn test_pool_timeout_is_store_unavailable() {
        let error = write_error("insert application", sqlx::Error::PoolTimedOut);
        assert!(matches!(error, DomainError::StoreUnavailable { .. }));
    }

    #[test]
    fn test_other_write_failure_is_persistence() {
        let error = write_error("insert application", sqlx::Error::RowNotFound);
        assert!(matches!(error, DomainError::Persistence { .. }));
    }

    #[test]
    fn test_update_details_keeps_absent_columns() {
        for column in ["app_name", "description", "owners", "team_name"] {
            assert!(UPDATE_DETAILS.contains(&format!("{column} = COALESCE(")));
        }
    }

    #[test]
    fn test_update_api_key_requires_valid_application() {
        assert!(UPDATE_API_KEY.ends_with("WHERE id = $1 AND is_valid"));
    }

    #[test]
    fn test_read_failure_is_store_unavailable() {
        let error = read_error("list applications", sqlx::Error::RowNotFound);
        assert!(matches!(error, DomainError::StoreUnavailable { .. }));
        assert!(error.to_string().contains("list applications"));
    }
}
