//! Token infrastructure
//!
//! Random sources, the token encoding and the retry-until-unique generator
//! used for application identifiers and API keys.

mod encoder;
mod generator;
mod source;

pub use encoder::{encode_token, redact_token, TokenKind, API_KEY_PREFIX, APPLICATION_ID_PREFIX};
pub use generator::{IdentifierGenerator, DEFAULT_MAX_ATTEMPTS};
pub use source::{OsRandomSource, RandomSource, SeededRandomSource, TOKEN_BYTES};
