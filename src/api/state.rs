//! Application state for shared services

use std::sync::Arc;

use crate::infrastructure::application::ApplicationRegistry;

/// State shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<ApplicationRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<ApplicationRegistry>) -> Self {
        Self { registry }
    }
}
