use thiserror::Error;

use super::application::UniqueColumn;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entropy unavailable: {message}")]
    EntropyUnavailable { message: String },

    #[error("Store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Conflict on {column}: {message}")]
    Conflict {
        column: UniqueColumn,
        message: String,
    },

    #[error("Identifier generation exhausted after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl DomainError {
    pub fn entropy_unavailable(message: impl Into<String>) -> Self {
        Self::EntropyUnavailable {
            message: message.into(),
        }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    pub fn conflict(column: UniqueColumn, message: impl Into<String>) -> Self {
        Self::Conflict {
            column,
            message: message.into(),
        }
    }

    pub fn generation_exhausted(attempts: u32) -> Self {
        Self::GenerationExhausted { attempts }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether the caller may safely retry the whole operation
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::EntropyUnavailable { .. } | Self::StoreUnavailable { .. }
        )
    }
}
