//! Axum router construction.
//!
//! Assembles the stream and history routes into a single [`Router`]
//! with CORS enabled so browser dashboards on other origins can attach
//! to the feed.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::stream;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /stream` -- server-sent events, one reading per tick
/// - `GET /history` -- JSON array of the history window
/// - `GET /health` -- subscriber count and window fill
///
/// Unknown paths get a JSON 404.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/stream", get(stream::stream_readings))
        .route("/history", get(handlers::get_history))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
