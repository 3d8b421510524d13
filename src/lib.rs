//! ODS Application Registry
//!
//! Registers client applications of the ODS platform and issues each one an
//! opaque identifier (`ods_app_...`) and API key (`ods_key_...`):
//! - Collision-checked token generation from a cryptographic random source
//! - In-memory or PostgreSQL storage with enforced uniqueness
//! - JSON HTTP API for create, list, get, update and delete

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::info;

use api::state::AppState;
use infrastructure::application::ApplicationRegistry;
use infrastructure::storage::StorageFactory;
use infrastructure::token::IdentifierGenerator;

/// Build the registry described by `config`
pub async fn create_registry(config: &AppConfig) -> anyhow::Result<ApplicationRegistry> {
    let storage = config.storage_config()?;
    let repository = StorageFactory::create_application_repository(&storage).await?;

    let generator =
        IdentifierGenerator::default().with_max_attempts(config.registry.max_generation_attempts);

    info!(
        max_attempts = generator.max_attempts(),
        store_timeout_ms = config.registry.store_timeout_ms,
        "Application registry ready"
    );

    Ok(ApplicationRegistry::new(repository)
        .with_generator(generator)
        .with_store_timeout(config.registry.store_timeout()))
}

/// Create the shared HTTP state
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let registry = create_registry(config).await?;
    Ok(AppState::new(Arc::new(registry)))
}
