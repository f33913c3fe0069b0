//! Application state for the crossing API

use std::sync::Arc;

use xing_core::RailwaySystem;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    system: Arc<RailwaySystem>,
}

impl AppState {
    pub fn new(system: Arc<RailwaySystem>) -> Self {
        Self { system }
    }

    pub fn system(&self) -> &RailwaySystem {
        &self.system
    }
}
