//! Domain layer - Core business logic and types

pub mod application;
pub mod error;

pub use application::{Application, ApplicationDetails, ApplicationId, ApplicationUpdate};
pub use error::DomainError;
