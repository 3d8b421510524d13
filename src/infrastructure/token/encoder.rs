//! Token encoding
//!
//! Tokens are standard base64 with `+` mapped to `0` and `/` mapped to `1`,
//! behind a fixed prefix. The alphabet is kept as-is for compatibility with
//! tokens already issued; it is not base62.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::domain::application::UniqueColumn;

pub const APPLICATION_ID_PREFIX: &str = "ods_app_";
pub const API_KEY_PREFIX: &str = "ods_key_";

/// Characters of the random part kept when a token is shown in logs
const VISIBLE_CHARS: usize = 4;

/// The kinds of token issued to an application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    ApplicationId,
    ApiKey,
}

impl TokenKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::ApplicationId => APPLICATION_ID_PREFIX,
            Self::ApiKey => API_KEY_PREFIX,
        }
    }

    /// The column the token must be unique in
    pub fn column(&self) -> UniqueColumn {
        match self {
            Self::ApplicationId => UniqueColumn::Id,
            Self::ApiKey => UniqueColumn::ApiKey,
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApplicationId => write!(f, "application_id"),
            Self::ApiKey => write!(f, "api_key"),
        }
    }
}

/// Encode raw bytes as a prefixed token
pub fn encode_token(prefix: &str, bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);

    let mut token = String::with_capacity(prefix.len() + encoded.len());
    token.push_str(prefix);
    token.extend(encoded.chars().map(|c| match c {
        '+' => '0',
        '/' => '1',
        other => other,
    }));
    token
}

/// Shorten a token to its prefix plus a few characters, for logging
pub fn redact_token(token: &str) -> &str {
    let visible = token
        .find('_')
        .and_then(|first| token[first + 1..].find('_').map(|second| first + second + 2))
        .unwrap_or(0)
        + VISIBLE_CHARS;

    token.get(..visible).unwrap_or(token)
}
