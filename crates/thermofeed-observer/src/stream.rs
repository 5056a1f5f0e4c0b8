//! Server-sent events handler for the live reading feed.
//!
//! Clients connect to `GET /stream` and receive one `data:` frame per
//! tick carrying the JSON-encoded reading. Each connection owns a
//! [`Subscription`]; when the client goes away Axum drops the response
//! stream, which drops the subscription and removes the connection from
//! the registry.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderValue, header};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use thermofeed_core::Subscription;
use tracing::debug;

use crate::state::AppState;

/// Open a push channel and stream readings until the client disconnects.
///
/// # Route
///
/// `GET /stream`
pub async fn stream_readings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let subscription = state.subscribe();
    debug!(id = %subscription.id(), subscribers = state.registry.len(), "stream client connected");

    (
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (header::CONNECTION, HeaderValue::from_static("keep-alive")),
        ],
        Sse::new(reading_events(subscription)).keep_alive(KeepAlive::default()),
    )
}

/// Turn a subscription into a stream of SSE events, ending when the
/// subscription is closed.
fn reading_events(
    subscription: Subscription,
) -> impl Stream<Item = Result<Event, axum::Error>> + Send {
    stream::unfold(subscription, |mut subscription| async move {
        let reading = subscription.recv().await?;
        Some((Event::default().json_data(&*reading), subscription))
    })
}
