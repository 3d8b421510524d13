//! Application registry
//!
//! Issues identifiers and API keys to new applications and manages their
//! records. This is the layer that decides which failures are retried:
//! a write that hits a uniqueness conflict is retried with fresh tokens,
//! everything else is surfaced to the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::application::{
    validate_application_details, validate_application_update, Application, ApplicationDetails,
    ApplicationId, ApplicationRepository, ApplicationUpdate, UniqueColumn, UniquenessOracle,
};
use crate::domain::DomainError;
use crate::infrastructure::token::{redact_token, IdentifierGenerator, TokenKind};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Application registry service
#[derive(Debug, Clone)]
pub struct ApplicationRegistry {
    repository: Arc<dyn ApplicationRepository>,
    generator: IdentifierGenerator,
    store_timeout: Duration,
}

impl ApplicationRegistry {
    /// Create a registry over an injected repository
    pub fn new(repository: Arc<dyn ApplicationRepository>) -> Self {
        Self {
            repository,
            generator: IdentifierGenerator::default(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Create with a custom generator
    pub fn with_generator(mut self, generator: IdentifierGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Bound every store call by `timeout`
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Register a new application with a fresh identifier and API key
    pub async fn create(&self, details: ApplicationDetails) -> Result<Application, DomainError> {
        validate_application_details(&details)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        info!(name = %details.name, team = %details.team_name, "Registering application");

        let oracle = self.oracle();
        let max_attempts = self.generator.max_attempts();

        for attempt in 1..=max_attempts {
            let id = self
                .generator
                .generate(&oracle, TokenKind::ApplicationId)
                .await?;
            let api_key = self.generator.generate(&oracle, TokenKind::ApiKey).await?;
            let application = Application::new(ApplicationId::new(id), api_key, details.clone());

            match self
                .bounded("insert application", self.repository.insert(application))
                .await
            {
                Ok(created) => {
                    info!(id = %created.id(), attempt, "Application registered");
                    return Ok(created);
                }
                Err(DomainError::Conflict { column, .. }) => {
                    warn!(%column, attempt, "Generated token collided on insert, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(DomainError::generation_exhausted(max_attempts))
    }

    /// Get an application by ID
    pub async fn get(&self, id: &ApplicationId) -> Result<Application, DomainError> {
        self.bounded("get application", self.repository.get(id))
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// List all applications
    pub async fn list(&self) -> Result<Vec<Application>, DomainError> {
        self.bounded("list applications", self.repository.list())
            .await
    }

    /// Overwrite the editable fields present in `update`.
    ///
    /// Absent fields are left to the store, so concurrent updates of
    /// different fields do not overwrite each other.
    pub async fn update(
        &self,
        id: &ApplicationId,
        update: ApplicationUpdate,
    ) -> Result<Application, DomainError> {
        info!(id = %id, "Updating application");

        validate_application_update(&update)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        if update.is_empty() {
            return self.get(id).await;
        }

        self.bounded(
            "update application",
            self.repository.update_details(id, &update),
        )
        .await?
        .ok_or_else(|| not_found(id))
    }

    /// Delete an application permanently
    pub async fn delete(&self, id: &ApplicationId) -> Result<(), DomainError> {
        info!(id = %id, "Deleting application");

        if self
            .bounded("delete application", self.repository.delete(id))
            .await?
        {
            Ok(())
        } else {
            Err(not_found(id))
        }
    }

    /// Mark an application's API key as unusable. Revoking twice is a no-op.
    pub async fn revoke(&self, id: &ApplicationId) -> Result<Application, DomainError> {
        info!(id = %id, "Revoking application");

        let current = self.get(id).await?;

        if !current.is_valid() {
            debug!(id = %id, "Application already revoked");
            return Ok(current);
        }

        self.bounded("revoke application", self.repository.revoke(id))
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Issue a new API key for an active application, keeping its ID
    pub async fn refresh_api_key(&self, id: &ApplicationId) -> Result<Application, DomainError> {
        info!(id = %id, "Refreshing API key");

        let current = self.get(id).await?;

        if !current.is_valid() {
            return Err(revoked(id));
        }

        let oracle = self.oracle();
        let max_attempts = self.generator.max_attempts();

        for attempt in 1..=max_attempts {
            let api_key = self.generator.generate(&oracle, TokenKind::ApiKey).await?;

            match self
                .bounded(
                    "update API key",
                    self.repository.update_api_key(id, &api_key),
                )
                .await
            {
                Ok(Some(updated)) => {
                    info!(id = %id, key = redact_token(updated.api_key()), "API key refreshed");
                    return Ok(updated);
                }
                Ok(None) => {
                    // deleted or revoked since the first read
                    return match self.get(id).await {
                        Ok(_) => Err(revoked(id)),
                        Err(e) => Err(e),
                    };
                }
                Err(DomainError::Conflict { column, .. }) => {
                    warn!(%column, attempt, "Refreshed key collided on update, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(DomainError::generation_exhausted(max_attempts))
    }

    /// Resolve the active application owning `api_key`.
    ///
    /// Unknown and revoked keys are both reported as `NotFound`.
    pub async fn resolve_api_key(&self, api_key: &str) -> Result<Application, DomainError> {
        let application = self
            .bounded(
                "get application by API key",
                self.repository.get_by_api_key(api_key),
            )
            .await?;

        match application {
            Some(app) if app.is_valid() => Ok(app),
            Some(app) => {
                debug!(id = %app.id(), "Rejected revoked API key");
                Err(DomainError::not_found("API key not recognised"))
            }
            None => Err(DomainError::not_found("API key not recognised")),
        }
    }

    fn oracle(&self) -> BoundedOracle<'_> {
        BoundedOracle {
            repository: self.repository.as_ref(),
            timeout: self.store_timeout,
        }
    }

    async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        with_timeout(self.store_timeout, operation, call).await
    }
}

/// Uniqueness checks against the repository, under the store timeout
struct BoundedOracle<'a> {
    repository: &'a dyn ApplicationRepository,
    timeout: Duration,
}

#[async_trait]
impl<'a> UniquenessOracle for BoundedOracle<'a> {
    async fn is_taken(&self, column: UniqueColumn, value: &str) -> Result<bool, DomainError> {
        with_timeout(
            self.timeout,
            "check uniqueness",
            self.repository.is_taken(column, value),
        )
        .await
    }
}

async fn with_timeout<T, F>(timeout: Duration, operation: &str, call: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    tokio::time::timeout(timeout, call).await.unwrap_or_else(|_| {
        Err(DomainError::store_unavailable(format!(
            "{} timed out after {}ms",
            operation,
            timeout.as_millis()
        )))
    })
}

fn not_found(id: &ApplicationId) -> DomainError {
    DomainError::not_found(format!("Application '{}' not found", id))
}

fn revoked(id: &ApplicationId) -> DomainError {
    DomainError::validation(format!(
        "Application '{}' is revoked and cannot be issued a new key",
        id
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use tokio_test::{assert_err, assert_ok};

    use crate::domain::application::mock::ScriptedApplicationRepository;
    use crate::infrastructure::application::InMemoryApplicationRepository;
    use crate::infrastructure::token::SeededRandomSource;

    fn registry() -> ApplicationRegistry {
        ApplicationRegistry::new(Arc::new(InMemoryApplicationRepository::new()))
    }

    fn scripted(repo: Arc<ScriptedApplicationRepository>) -> ApplicationRegistry {
        ApplicationRegistry::new(repo)
            .with_generator(IdentifierGenerator::new(Arc::new(SeededRandomSource::new(11))))
    }

    fn demo() -> ApplicationDetails {
        ApplicationDetails::new("demo")
            .with_description("d")
            .with_owners("alice")
            .with_team_name("core")
    }

    #[tokio::test]
    async fn test_registration_lifecycle() {
        let registry = registry();

        let created = registry.create(demo()).await.unwrap();
        assert!(created.is_valid());
        assert!(created.id().as_str().starts_with("ods_app_"));
        assert!(created.api_key().starts_with("ods_key_"));
        assert_eq!(created.details(), &demo());

        let fetched = registry.get(created.id()).await.unwrap();
        assert_eq!(fetched, created);

        registry
            .update(created.id(), ApplicationUpdate::new().with_name("demo2"))
            .await
            .unwrap();
        let updated = registry.get(created.id()).await.unwrap();
        assert_eq!(updated.name(), "demo2");
        assert_eq!(updated.description(), "d");
        assert_eq!(updated.owners(), "alice");
        assert_eq!(updated.team_name(), "core");
        assert_eq!(updated.id(), created.id());
        assert_eq!(updated.api_key(), created.api_key());
        assert!(updated.is_valid());

        registry.delete(created.id()).await.unwrap();
        let result = registry.get(created.id()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_created_tokens_are_unique_across_records() {
        let registry = registry();
        let mut ids = HashSet::new();
        let mut keys = HashSet::new();

        for i in 0..50 {
            let app = registry
                .create(ApplicationDetails::new(format!("app-{i}")))
                .await
                .unwrap();
            assert!(ids.insert(app.id().to_string()));
            assert!(keys.insert(app.api_key().to_string()));
        }

        assert_eq!(registry.list().await.unwrap().len(), 50);
    }

    #[tokio::test]
    async fn test_invalid_details_rejected_before_generation() {
        let repo = Arc::new(ScriptedApplicationRepository::new());
        let registry = scripted(repo.clone());

        let result = registry.create(ApplicationDetails::new("  ")).await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
        assert_eq!(repo.oracle_checks(), 0);
        assert_eq!(repo.insert_attempts(), 0);
    }

    #[tokio::test]
    async fn test_insert_conflict_triggers_one_regeneration() {
        let repo = Arc::new(
            ScriptedApplicationRepository::new().with_insert_conflicts(vec![UniqueColumn::Id]),
        );
        let registry = scripted(repo.clone());

        let created = registry.create(demo()).await.unwrap();

        assert_eq!(repo.insert_attempts(), 2);
        // one id check and one key check per attempt
        assert_eq!(repo.oracle_checks(), 4);
        assert_eq!(repo.stored(), vec![created.clone()]);

        let attempts = repo.attempted_inserts();
        assert_eq!(attempts.len(), 2);
        assert_ne!(attempts[0].id(), attempts[1].id());
        assert_ne!(attempts[0].api_key(), attempts[1].api_key());
        assert_eq!(&attempts[1], &created);
    }

    #[tokio::test]
    async fn test_persistent_conflicts_exhaust_generation() {
        let repo = Arc::new(ScriptedApplicationRepository::new().with_insert_conflicts(vec![
            UniqueColumn::ApiKey;
            10
        ]));
        let registry = scripted(repo.clone()).with_generator(
            IdentifierGenerator::new(Arc::new(SeededRandomSource::new(12))).with_max_attempts(3),
        );

        let result = registry.create(demo()).await;

        assert!(matches!(
            result,
            Err(DomainError::GenerationExhausted { attempts: 3 })
        ));
        assert_eq!(repo.insert_attempts(), 3);
        assert!(repo.stored().is_empty());
    }

    #[tokio::test]
    async fn test_taken_precheck_redraws_without_insert() {
        let repo = Arc::new(ScriptedApplicationRepository::new().with_taken_checks(2));
        let registry = scripted(repo.clone());

        registry.create(demo()).await.unwrap();

        assert_eq!(repo.oracle_checks(), 4);
        assert_eq!(repo.insert_attempts(), 1);
    }

    #[tokio::test]
    async fn test_store_unavailable_propagates_without_record() {
        let repo = Arc::new(ScriptedApplicationRepository::new().with_unavailable("db down"));
        let registry = scripted(repo.clone());

        let result = registry.create(demo()).await;

        assert!(matches!(result, Err(DomainError::StoreUnavailable { .. })));
        assert_eq!(repo.insert_attempts(), 0);
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let repo = Arc::new(
            ScriptedApplicationRepository::new().with_latency(Duration::from_millis(200)),
        );
        let registry = scripted(repo).with_store_timeout(Duration::from_millis(20));

        let result = registry.list().await;

        match result {
            Err(DomainError::StoreUnavailable { message }) => {
                assert!(message.contains("timed out"));
            }
            other => panic!("Expected StoreUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let result = registry()
            .update(
                &ApplicationId::new("ods_app_missing"),
                ApplicationUpdate::new().with_name("x"),
            )
            .await;

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_name() {
        let registry = registry();
        let created = registry.create(demo()).await.unwrap();

        let result = registry
            .update(created.id(), ApplicationUpdate::new().with_name(""))
            .await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
        assert_eq!(registry.get(created.id()).await.unwrap().name(), "demo");
    }

    #[tokio::test]
    async fn test_concurrent_updates_of_different_fields_both_persist() {
        let repo = Arc::new(
            ScriptedApplicationRepository::new().with_latency(Duration::from_millis(10)),
        );
        let registry = scripted(repo.clone());
        let created = registry.create(demo()).await.unwrap();

        let (renamed, reowned) = tokio::join!(
            registry.update(created.id(), ApplicationUpdate::new().with_name("renamed")),
            registry.update(created.id(), ApplicationUpdate::new().with_owners("bob")),
        );
        assert_ok!(renamed);
        assert_ok!(reowned);

        let stored = registry.get(created.id()).await.unwrap();
        assert_eq!(stored.name(), "renamed");
        assert_eq!(stored.owners(), "bob");
        assert_eq!(stored.description(), "d");
        assert_eq!(stored.team_name(), "core");
    }

    #[tokio::test]
    async fn test_invalid_update_does_not_reach_store() {
        let repo = Arc::new(ScriptedApplicationRepository::new());
        let registry = scripted(repo.clone());
        let created = registry.create(demo()).await.unwrap();

        let result = registry
            .update(created.id(), ApplicationUpdate::new().with_owners("o".repeat(501)))
            .await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
        assert_eq!(repo.stored()[0].owners(), "alice");
    }

    #[tokio::test]
    async fn test_empty_update_returns_current_record() {
        let registry = registry();
        let created = registry.create(demo()).await.unwrap();

        let unchanged = registry
            .update(created.id(), ApplicationUpdate::new())
            .await
            .unwrap();

        assert_eq!(unchanged, created);
    }

    #[tokio::test]
    async fn test_repeated_delete_is_not_found() {
        let registry = registry();
        let created = registry.create(demo()).await.unwrap();

        registry.delete(created.id()).await.unwrap();
        let second = registry.delete(created.id()).await;

        assert!(matches!(second, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_revoke_disables_key() {
        let registry = registry();
        let created = registry.create(demo()).await.unwrap();

        let resolved = registry.resolve_api_key(created.api_key()).await.unwrap();
        assert_eq!(resolved.id(), created.id());

        let revoked = registry.revoke(created.id()).await.unwrap();
        assert!(!revoked.is_valid());
        assert_eq!(revoked.api_key(), created.api_key());

        let result = registry.resolve_api_key(created.api_key()).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));

        // revoking again is a no-op
        let again = registry.revoke(created.id()).await.unwrap();
        assert_eq!(again, revoked);
    }

    #[tokio::test]
    async fn test_revoked_application_keeps_status_through_update() {
        let registry = registry();
        let created = registry.create(demo()).await.unwrap();
        registry.revoke(created.id()).await.unwrap();

        let updated = registry
            .update(created.id(), ApplicationUpdate::new().with_team_name("platform"))
            .await
            .unwrap();

        assert_eq!(updated.team_name(), "platform");
        assert!(!updated.is_valid());
    }

    #[tokio::test]
    async fn test_refresh_api_key() {
        let registry = registry();
        let created = registry.create(demo()).await.unwrap();

        let refreshed = registry.refresh_api_key(created.id()).await.unwrap();

        assert_eq!(refreshed.id(), created.id());
        assert_ne!(refreshed.api_key(), created.api_key());
        assert!(refreshed.api_key().starts_with("ods_key_"));
        assert_err!(registry.resolve_api_key(created.api_key()).await);
        assert_ok!(registry.resolve_api_key(refreshed.api_key()).await);
    }

    #[tokio::test]
    async fn test_refresh_revoked_application_fails() {
        let registry = registry();
        let created = registry.create(demo()).await.unwrap();
        registry.revoke(created.id()).await.unwrap();

        let result = registry.refresh_api_key(created.id()).await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_refresh_racing_revoke_keeps_revoked_key() {
        // the record is revoked between the registry's read and its key write
        let repo = Arc::new(ScriptedApplicationRepository::new().with_revoke_after_get());
        let created = Application::new(ApplicationId::new("ods_app_race"), "ods_key_race", demo());
        repo.insert(created.clone()).await.unwrap();
        let registry = scripted(repo.clone());

        let result = registry.refresh_api_key(created.id()).await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
        let stored = &repo.stored()[0];
        assert!(!stored.is_valid());
        assert_eq!(stored.api_key(), created.api_key());
    }

    #[tokio::test]
    async fn test_resolve_unknown_key() {
        let result = registry().resolve_api_key("ods_key_unknown").await;

        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
