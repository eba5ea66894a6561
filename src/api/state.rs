//! Application state for the API server

use crate::{Config, JobRegistry};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request; every field is reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// The job registry that owns the log, artifact slot and current job
    pub registry: JobRegistry,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(registry: JobRegistry, config: Arc<Config>) -> Self {
        Self { registry, config }
    }
}
