//! Shared application state.

use crate::{cache::EventsUnderConstruction, config::Config};

/// State shared between the gateway handlers and the background jobs.
///
/// Wrapped in an `Arc` at startup; the configuration is read-only after load
/// and the construction cache guards its own interior.
pub struct AppState {
    pub config: Config,
    pub events_under_construction: EventsUnderConstruction,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            events_under_construction: EventsUnderConstruction::new(),
        }
    }
}
