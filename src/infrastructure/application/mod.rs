//! Application infrastructure implementations
//!
//! This module provides the application registry service and the
//! in-memory and PostgreSQL repositories behind it.

mod in_memory;
mod postgres_repository;
mod registry;

pub use in_memory::InMemoryApplicationRepository;
pub use postgres_repository::PostgresApplicationRepository;
pub use registry::{ApplicationRegistry, DEFAULT_STORE_TIMEOUT};
