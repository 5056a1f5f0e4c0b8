//! Shared application state for the HTTP API.
//!
//! [`AppState`] carries the two handles the handlers need: the
//! subscriber registry owned by the tick loop (for `/stream`) and the
//! history window (for `/history`). Both are built once at startup and
//! injected via Axum's `State` extractor.

use std::sync::Arc;

use thermofeed_core::{Broadcaster, HistoryLog, SubscriberRegistry, Subscription};

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    /// Live subscriber set fed by the tick loop.
    pub registry: Arc<SubscriberRegistry>,
    /// Bounded history window.
    pub history: HistoryLog,
}

impl AppState {
    /// Create application state from explicit handles.
    pub const fn new(registry: Arc<SubscriberRegistry>, history: HistoryLog) -> Self {
        Self { registry, history }
    }

    /// Share the registry and history of a broadcaster that has not yet
    /// been started.
    pub fn from_broadcaster(broadcaster: &Broadcaster) -> Self {
        Self {
            registry: broadcaster.registry(),
            history: broadcaster.history().clone(),
        }
    }

    /// Register a new stream connection.
    pub fn subscribe(&self) -> Subscription {
        self.registry.subscribe()
    }
}
