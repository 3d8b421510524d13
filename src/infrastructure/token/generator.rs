//! Identifier generation
//!
//! Draws random tokens until one is reported free by the uniqueness oracle,
//! giving up after a fixed number of attempts.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::application::UniquenessOracle;
use crate::domain::DomainError;

use super::encoder::{encode_token, redact_token, TokenKind};
use super::source::{OsRandomSource, RandomSource};

/// Default cap on draws per token, and on insert retries in the registry
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Generator for unique application identifiers and API keys
#[derive(Debug, Clone)]
pub struct IdentifierGenerator {
    source: Arc<dyn RandomSource>,
    max_attempts: u32,
}

impl IdentifierGenerator {
    /// Create a generator over the given random source
    pub fn new(source: Arc<dyn RandomSource>) -> Self {
        Self {
            source,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Set the maximum number of draws per token (at least one)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Produce a token of `kind` that the oracle reports as unused
    pub async fn generate<O>(&self, oracle: &O, kind: TokenKind) -> Result<String, DomainError>
    where
        O: UniquenessOracle + ?Sized,
    {
        for attempt in 1..=self.max_attempts {
            let bytes = self.source.draw()?;
            let token = encode_token(kind.prefix(), &bytes);

            if !oracle.is_taken(kind.column(), &token).await? {
                debug!(%kind, attempt, token = redact_token(&token), "Generated unique token");
                return Ok(token);
            }

            warn!(%kind, attempt, "Generated token already in use, drawing again");
        }

        Err(DomainError::generation_exhausted(self.max_attempts))
    }
}

impl Default for IdentifierGenerator {
    fn default() -> Self {
        Self::new(Arc::new(OsRandomSource))
    }
}
