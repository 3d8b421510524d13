//! Application validation

use thiserror::Error;

use super::entity::{ApplicationDetails, ApplicationUpdate};

/// Errors that can occur during application validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApplicationValidationError {
    #[error("Application name cannot be empty")]
    EmptyName,

    #[error("Application name cannot exceed {0} characters")]
    NameTooLong(usize),

    #[error("Application {field} cannot exceed {max} characters")]
    FieldTooLong { field: &'static str, max: usize },
}

const MAX_NAME_LENGTH: usize = 100;
const MAX_TEXT_FIELD_LENGTH: usize = 500;

/// Validate an application display name
pub fn validate_application_name(name: &str) -> Result<(), ApplicationValidationError> {
    if name.trim().is_empty() {
        return Err(ApplicationValidationError::EmptyName);
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApplicationValidationError::NameTooLong(MAX_NAME_LENGTH));
    }

    Ok(())
}

/// Validate all editable fields of an application
pub fn validate_application_details(
    details: &ApplicationDetails,
) -> Result<(), ApplicationValidationError> {
    validate_application_name(&details.name)?;

    let text_fields = [
        ("description", &details.description),
        ("owners", &details.owners),
        ("teamName", &details.team_name),
    ];

    for (field, value) in text_fields {
        validate_text_field(field, value)?;
    }

    Ok(())
}

/// Validate only the fields present in a partial update
pub fn validate_application_update(
    update: &ApplicationUpdate,
) -> Result<(), ApplicationValidationError> {
    if let Some(name) = &update.name {
        validate_application_name(name)?;
    }

    let text_fields = [
        ("description", &update.description),
        ("owners", &update.owners),
        ("teamName", &update.team_name),
    ];

    for (field, value) in text_fields {
        if let Some(value) = value {
            validate_text_field(field, value)?;
        }
    }

    Ok(())
}

fn validate_text_field(field: &'static str, value: &str) -> Result<(), ApplicationValidationError> {
    if value.chars().count() > MAX_TEXT_FIELD_LENGTH {
        return Err(ApplicationValidationError::FieldTooLong {
            field,
            max: MAX_TEXT_FIELD_LENGTH,
        });
    }

    Ok(())
}
