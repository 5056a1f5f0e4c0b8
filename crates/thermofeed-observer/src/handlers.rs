//! REST endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/history` | Full history window, oldest first |
//! | `GET` | `/health` | Subscriber count and window fill |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::Uri;
use thermofeed_core::Reading;
use tracing::error;

use crate::error::ObserverError;
use crate::state::AppState;

/// Response body for `GET /health`.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the store answered.
    pub status: String,
    /// Live stream connections.
    pub subscribers: usize,
    /// Entries currently in the history window.
    pub history_len: u64,
    /// Maximum entries retained.
    pub window: usize,
}

// ---------------------------------------------------------------------------
// GET /history
// ---------------------------------------------------------------------------

/// Return every reading in the window as a JSON array.
///
/// No pagination or filtering. An empty store yields `[]`.
pub async fn get_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Reading>>, ObserverError> {
    let readings = state.history.readings().await.map_err(|e| {
        error!(error = %e, "history read failed");
        ObserverError::from(e)
    })?;
    Ok(Json(readings))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report liveness plus the current subscriber and history counts.
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ObserverError> {
    let history_len = state.history.len().await?;
    Ok(Json(HealthResponse {
        status: "ok".to_owned(),
        subscribers: state.registry.len(),
        history_len,
        window: state.history.window(),
    }))
}

/// JSON 404 for unknown routes.
pub async fn not_found(uri: Uri) -> ObserverError {
    ObserverError::NotFound(format!("no route for {uri}"))
}
