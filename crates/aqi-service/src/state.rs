//! Application state shared across handlers.

use std::sync::Arc;

use aqi_core::AcquisitionService;

use crate::config::Config;

/// Shared application state.
pub struct AppState {
    /// The acquisition pipeline, which owns the store handle.
    pub acquisition: AcquisitionService,
    /// Configuration, fixed at startup.
    pub config: Config,
}

impl AppState {
    /// Create new application state.
    pub fn new(acquisition: AcquisitionService, config: Config) -> Arc<Self> {
        Arc::new(Self {
            acquisition,
            config,
        })
    }
}
