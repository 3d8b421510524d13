//! Application domain
//!
//! An application is a registered API client. Each one is issued a unique
//! `ods_app_` identifier and a unique `ods_key_` API key.

mod entity;
mod repository;
mod validation;

pub use entity::{
    Application, ApplicationDetails, ApplicationId, ApplicationStatus, ApplicationUpdate,
};
pub use repository::{ApplicationRepository, UniqueColumn, UniquenessOracle};
pub use validation::{
    validate_application_details, validate_application_name, validate_application_update,
    ApplicationValidationError,
};

#[cfg(test)]
pub use repository::mock;
#[cfg(test)]
pub use repository::MockUniquenessOracle;
