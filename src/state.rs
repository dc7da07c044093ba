//! Application state management
//!
//! Shared state passed to the gateway handlers via Axum's State extractor.

use std::sync::Arc;

use crate::room::RoomRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

/// Inner state (wrapped in Arc for cheap cloning)
struct AppStateInner {
    /// Registry of live contest rooms
    registry: Arc<RoomRegistry>,
}

impl AppState {
    /// Create a new application state
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { registry }),
        }
    }

    /// Get the live room registry
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.inner.registry
    }
}
