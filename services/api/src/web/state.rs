//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use psico_core::{Orchestrator, RecordStore};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Owns the record store and the AI gateway; every write goes through it.
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Direct store access for reads and deletes, which have no AI step.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        self.orchestrator.store()
    }
}
