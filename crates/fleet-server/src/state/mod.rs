//! Shared server state.

pub mod commands;
pub mod registry;
pub mod tracks;

use std::sync::Arc;

use crate::config::Config;
use crate::simulator::FleetSimulator;
use crate::sources::ZoneSource;
use registry::FleetRegistry;

/// Application state handed to every request handler.
pub struct AppState {
    pub registry: Arc<FleetRegistry>,
    pub simulator: Arc<FleetSimulator>,
    pub zones: Arc<dyn ZoneSource>,
    config: Config,
}

impl AppState {
    pub fn new(
        registry: Arc<FleetRegistry>,
        simulator: Arc<FleetSimulator>,
        zones: Arc<dyn ZoneSource>,
        config: Config,
    ) -> Self {
        Self {
            registry,
            simulator,
            zones,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
