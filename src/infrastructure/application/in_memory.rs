//! In-memory application repository

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::application::{
    Application, ApplicationId, ApplicationRepository, ApplicationUpdate, UniqueColumn,
    UniquenessOracle,
};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct Records {
    /// Applications in registration order
    applications: Vec<Application>,
    by_id: HashMap<String, usize>,
    by_api_key: HashMap<String, usize>,
}

impl Records {
    fn position(&self, id: &ApplicationId) -> Option<usize> {
        self.by_id.get(id.as_str()).copied()
    }

    fn reindex(&mut self) {
        self.by_id.clear();
        self.by_api_key.clear();

        for (index, app) in self.applications.iter().enumerate() {
            self.by_id.insert(app.id().as_str().to_string(), index);
            self.by_api_key.insert(app.api_key().to_string(), index);
        }
    }
}

/// Thread-safe in-memory repository
///
/// Enforces the same `id` and `api_key` uniqueness constraints as the
/// PostgreSQL schema. Data is lost when the process terminates.
#[derive(Debug, Default)]
pub struct InMemoryApplicationRepository {
    records: RwLock<Records>,
}

impl InMemoryApplicationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Records>, DomainError> {
        self.records.read().map_err(|e| {
            DomainError::store_unavailable(format!("Failed to acquire read lock: {}", e))
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Records>, DomainError> {
        self.records.write().map_err(|e| {
            DomainError::store_unavailable(format!("Failed to acquire write lock: {}", e))
        })
    }

    fn modify(
        &self,
        id: &ApplicationId,
        change: impl FnOnce(&mut Application),
    ) -> Result<Option<Application>, DomainError> {
        let mut records = self.write()?;

        let Some(index) = records.position(id) else {
            return Ok(None);
        };

        let app = &mut records.applications[index];
        change(app);
        Ok(Some(app.clone()))
    }
}

#[async_trait]
impl UniquenessOracle for InMemoryApplicationRepository {
    async fn is_taken(&self, column: UniqueColumn, value: &str) -> Result<bool, DomainError> {
        let records = self.read()?;

        Ok(match column {
            UniqueColumn::Id => records.by_id.contains_key(value),
            UniqueColumn::ApiKey => records.by_api_key.contains_key(value),
        })
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryApplicationRepository {
    async fn insert(&self, application: Application) -> Result<Application, DomainError> {
        let mut records = self.write()?;

        if records.by_id.contains_key(application.id().as_str()) {
            return Err(DomainError::conflict(
                UniqueColumn::Id,
                format!("Application '{}' already exists", application.id()),
            ));
        }

        if records.by_api_key.contains_key(application.api_key()) {
            return Err(DomainError::conflict(
                UniqueColumn::ApiKey,
                "API key already assigned to another application",
            ));
        }

        let index = records.applications.len();
        records
            .by_id
            .insert(application.id().as_str().to_string(), index);
        records
            .by_api_key
            .insert(application.api_key().to_string(), index);
        records.applications.push(application.clone());

        Ok(application)
    }

    async fn get(&self, id: &ApplicationId) -> Result<Option<Application>, DomainError> {
        let records = self.read()?;
        Ok(records
            .position(id)
            .map(|index| records.applications[index].clone()))
    }

    async fn get_by_api_key(&self, api_key: &str) -> Result<Option<Application>, DomainError> {
        let records = self.read()?;
        Ok(records
            .by_api_key
            .get(api_key)
            .map(|&index| records.applications[index].clone()))
    }

    async fn list(&self) -> Result<Vec<Application>, DomainError> {
        Ok(self.read()?.applications.clone())
    }

    async fn update_details(
        &self,
        id: &ApplicationId,
        update: &ApplicationUpdate,
    ) -> Result<Option<Application>, DomainError> {
        self.modify(id, |app| {
            let details = app.details().merged(update.clone());
            app.set_details(details);
        })
    }

    async fn update_api_key(
        &self,
        id: &ApplicationId,
        api_key: &str,
    ) -> Result<Option<Application>, DomainError> {
        let mut records = self.write()?;

        let Some(index) = records
            .position(id)
            .filter(|&index| records.applications[index].is_valid())
        else {
            return Ok(None);
        };

        if let Some(&holder) = records.by_api_key.get(api_key) {
            if holder != index {
                return Err(DomainError::conflict(
                    UniqueColumn::ApiKey,
                    "API key already assigned to another application",
                ));
            }
        }

        let previous = records.applications[index].api_key().to_string();
        records.by_api_key.remove(&previous);
        records.by_api_key.insert(api_key.to_string(), index);

        let app = &mut records.applications[index];
        app.replace_api_key(api_key);
        Ok(Some(app.clone()))
    }

    async fn revoke(&self, id: &ApplicationId) -> Result<Option<Application>, DomainError> {
        self.modify(id, |app| app.revoke())
    }

    async fn delete(&self, id: &ApplicationId) -> Result<bool, DomainError> {
        let mut records = self.write()?;

        let Some(index) = records.position(id) else {
            return Ok(false);
        };

        records.applications.remove(index);
        records.reindex();
        Ok(true)
    }
}
