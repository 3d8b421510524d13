//! Application entity and related types

use serde::{Deserialize, Serialize};

/// Application identifier (an `ods_app_` token), immutable once assigned
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(String);

impl ApplicationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ApplicationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ApplicationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Credential state of an application
///
/// `Active` is the state every application is created in. `Revoked` is
/// terminal: there is no transition back to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Active,
    Revoked,
}

impl ApplicationStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Revoked => write!(f, "revoked"),
        }
    }
}

/// The caller-editable fields of an application
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDetails {
    pub name: String,
    pub description: String,
    pub owners: String,
    pub team_name: String,
}

impl ApplicationDetails {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_owners(mut self, owners: impl Into<String>) -> Self {
        self.owners = owners.into();
        self
    }

    pub fn with_team_name(mut self, team_name: impl Into<String>) -> Self {
        self.team_name = team_name.into();
        self
    }

    /// Overlay the fields present in `update`, keeping the rest
    pub fn merged(&self, update: ApplicationUpdate) -> Self {
        Self {
            name: update.name.unwrap_or_else(|| self.name.clone()),
            description: update
                .description
                .unwrap_or_else(|| self.description.clone()),
            owners: update.owners.unwrap_or_else(|| self.owners.clone()),
            team_name: update.team_name.unwrap_or_else(|| self.team_name.clone()),
        }
    }
}

/// Partial update of the editable fields; `None` keeps the current value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplicationUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub owners: Option<String>,
    pub team_name: Option<String>,
}

impl ApplicationUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_owners(mut self, owners: impl Into<String>) -> Self {
        self.owners = Some(owners.into());
        self
    }

    pub fn with_team_name(mut self, team_name: impl Into<String>) -> Self {
        self.team_name = Some(team_name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.owners.is_none()
            && self.team_name.is_none()
    }
}

/// A registered client application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    id: ApplicationId,
    api_key: String,
    #[serde(flatten)]
    details: ApplicationDetails,
    is_valid: bool,
}

impl Application {
    /// Create a freshly issued, active application
    pub fn new(id: ApplicationId, api_key: impl Into<String>, details: ApplicationDetails) -> Self {
        Self {
            id,
            api_key: api_key.into(),
            details,
            is_valid: true,
        }
    }

    /// Rebuild an application from persisted columns
    pub fn restore(
        id: ApplicationId,
        api_key: impl Into<String>,
        details: ApplicationDetails,
        is_valid: bool,
    ) -> Self {
        Self {
            id,
            api_key: api_key.into(),
            details,
            is_valid,
        }
    }

    // Getters

    pub fn id(&self) -> &ApplicationId {
        &self.id
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn details(&self) -> &ApplicationDetails {
        &self.details
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn description(&self) -> &str {
        &self.details.description
    }

    pub fn owners(&self) -> &str {
        &self.details.owners
    }

    pub fn team_name(&self) -> &str {
        &self.details.team_name
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn status(&self) -> ApplicationStatus {
        if self.is_valid {
            ApplicationStatus::Active
        } else {
            ApplicationStatus::Revoked
        }
    }

    // Mutators

    /// Replace the editable fields. Identity, key and validity are untouched.
    pub fn set_details(&mut self, details: ApplicationDetails) {
        self.details = details;
    }

    pub(crate) fn replace_api_key(&mut self, api_key: impl Into<String>) {
        self.api_key = api_key.into();
    }

    pub(crate) fn revoke(&mut self) {
        self.is_valid = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> Application {
        Application::new(
            ApplicationId::new("ods_app_abc"),
            "ods_key_xyz",
            ApplicationDetails::new("demo")
                .with_description("d")
                .with_owners("alice")
                .with_team_name("core"),
        )
    }

    #[test]
    fn test_new_application_is_active() {
        let app = demo();

        assert!(app.is_valid());
        assert_eq!(app.status(), ApplicationStatus::Active);
        assert_eq!(app.id().as_str(), "ods_app_abc");
        assert_eq!(app.api_key(), "ods_key_xyz");
        assert_eq!(app.team_name(), "core");
    }

    #[test]
    fn test_revoke_is_terminal_flag() {
        let mut app = demo();
        app.revoke();

        assert!(!app.is_valid());
        assert_eq!(app.status(), ApplicationStatus::Revoked);
        assert_eq!(app.status().to_string(), "revoked");
    }

    #[test]
    fn test_set_details_keeps_credentials() {
        let mut app = demo();
        app.set_details(ApplicationDetails::new("renamed"));

        assert_eq!(app.name(), "renamed");
        assert_eq!(app.id().as_str(), "ods_app_abc");
        assert_eq!(app.api_key(), "ods_key_xyz");
        assert!(app.is_valid());
    }

    #[test]
    fn test_merged_only_overwrites_present_fields() {
        let details = demo().details().clone();
        let merged = details.merged(ApplicationUpdate::new().with_name("demo2"));

        assert_eq!(merged.name, "demo2");
        assert_eq!(merged.description, "d");
        assert_eq!(merged.owners, "alice");
        assert_eq!(merged.team_name, "core");
    }

    #[test]
    fn test_update_is_empty() {
        assert!(ApplicationUpdate::new().is_empty());
        assert!(!ApplicationUpdate::new().with_owners("bob").is_empty());
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(demo()).unwrap();

        assert_eq!(json["id"], "ods_app_abc");
        assert_eq!(json["apiKey"], "ods_key_xyz");
        assert_eq!(json["name"], "demo");
        assert_eq!(json["teamName"], "core");
        assert_eq!(json["isValid"], true);
    }
}
