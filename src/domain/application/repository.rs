//! Application repository and uniqueness oracle traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use super::entity::{Application, ApplicationId, ApplicationUpdate};
use crate::domain::DomainError;

/// Columns whose values must be unique across all applications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniqueColumn {
    Id,
    ApiKey,
}

impl UniqueColumn {
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::ApiKey => "api_key",
        }
    }
}

impl std::fmt::Display for UniqueColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Answers whether a value is already held in a unique column.
///
/// The answer is advisory: it can be stale by the time a write lands, so
/// writes must still be guarded by the store's own constraints.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UniquenessOracle: Send + Sync {
    async fn is_taken(&self, column: UniqueColumn, value: &str) -> Result<bool, DomainError>;
}

/// Persistence for application records
///
/// Implementations must reject an insert or key update that would duplicate
/// an `id` or `api_key` with [`DomainError::Conflict`].
#[async_trait]
pub trait ApplicationRepository: UniquenessOracle + std::fmt::Debug {
    /// Insert a fully populated application
    async fn insert(&self, application: Application) -> Result<Application, DomainError>;

    /// Get an application by ID
    async fn get(&self, id: &ApplicationId) -> Result<Option<Application>, DomainError>;

    /// Get the application holding an API key
    async fn get_by_api_key(&self, api_key: &str) -> Result<Option<Application>, DomainError>;

    /// List all applications in registration order
    async fn list(&self) -> Result<Vec<Application>, DomainError>;

    /// Apply the fields present in `update` in a single write; `None` if the
    /// application does not exist
    async fn update_details(
        &self,
        id: &ApplicationId,
        update: &ApplicationUpdate,
    ) -> Result<Option<Application>, DomainError>;

    /// Replace the API key of a valid application; `None` if the application
    /// does not exist or has been revoked
    async fn update_api_key(
        &self,
        id: &ApplicationId,
        api_key: &str,
    ) -> Result<Option<Application>, DomainError>;

    /// Mark the application revoked; `None` if it does not exist
    async fn revoke(&self, id: &ApplicationId) -> Result<Option<Application>, DomainError>;

    /// Delete an application, returns true if a record was removed
    async fn delete(&self, id: &ApplicationId) -> Result<bool, DomainError>;
}
