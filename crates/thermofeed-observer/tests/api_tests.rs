//! Integration tests for the HTTP API.
//!
//! Most tests use Axum's `Router` directly via `tower::ServiceExt`
//! without starting a TCP server; the shutdown test binds a real
//! listener. Ticks are driven by calling
//! [`Broadcaster::tick`] directly, or by spawning the loop under paused
//! Tokio time.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{TimeZone, Utc};
use futures::StreamExt as _;
use serde_json::Value;
use thermofeed_core::clock::SteppingTimeSource;
use thermofeed_core::history::{DEFAULT_HISTORY_KEY, DEFAULT_WINDOW};
use thermofeed_core::registry::DEFAULT_SUBSCRIBER_BUFFER;
use thermofeed_core::{Broadcaster, HistoryLog, ReadingGenerator, SubscriberRegistry};
use thermofeed_db::{HistoryBackend, MemoryStore, StoreOp};
use thermofeed_observer::router::build_router;
use thermofeed_observer::serve;
use thermofeed_observer::state::AppState;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tower::ServiceExt;

fn make_broadcaster_with(backend: HistoryBackend, window: usize) -> Broadcaster {
    let start = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
    let generator = ReadingGenerator::seeded(5, Arc::new(SteppingTimeSource::new(start, 1_000)));
    let history = HistoryLog::new(backend, DEFAULT_HISTORY_KEY, window);
    Broadcaster::new(
        SubscriberRegistry::new(DEFAULT_SUBSCRIBER_BUFFER),
        history,
        generator,
    )
}

fn make_broadcaster() -> Broadcaster {
    make_broadcaster_with(HistoryBackend::memory(), DEFAULT_WINDOW)
}

fn state_for(broadcaster: &Broadcaster) -> Arc<AppState> {
    Arc::new(AppState::from_broadcaster(broadcaster))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(state: Arc<AppState>, path: &str) -> axum::response::Response {
    build_router(state)
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Pull the next SSE frame off a streaming body and decode its payload.
async fn next_frame(body: &mut axum::body::BodyDataStream) -> Value {
    let chunk = body.next().await.unwrap().unwrap();
    let text = std::str::from_utf8(&chunk).unwrap();
    assert!(text.ends_with("\n\n"), "frame not terminated: {text:?}");
    let payload = text
        .lines()
        .find_map(|line| line.strip_prefix("data:"))
        .unwrap()
        .trim();
    serde_json::from_str(payload).unwrap()
}

fn assert_two_decimal_string(value: &Value) {
    let text = value.as_str().unwrap();
    let (whole, frac) = text.split_once('.').unwrap();
    assert_eq!(frac.len(), 2, "temperature {text} lacks two decimals");
    let degrees: u32 = whole.parse().unwrap();
    assert!(degrees <= 100);
}

// =========================================================================
// GET /history
// =========================================================================

#[tokio::test]
async fn test_history_empty_returns_empty_array() {
    let broadcaster = make_broadcaster();
    let response = get(state_for(&broadcaster), "/history").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn test_history_returns_ticks_in_order() {
    let mut broadcaster = make_broadcaster();
    let state = state_for(&broadcaster);
    let mut emitted = Vec::new();
    for _ in 0..4 {
        emitted.push(broadcaster.tick().await.reading);
    }

    let response = get(state, "/history").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let entries = json.as_array().unwrap();

    assert_eq!(entries.len(), 4);
    for (entry, reading) in entries.iter().zip(&emitted) {
        assert_eq!(entry["timestamp"], reading.timestamp.as_str());
        assert_eq!(entry["temperature"], reading.temperature.to_string());
        assert_two_decimal_string(&entry["temperature"]);
    }
}

#[tokio::test]
async fn test_history_is_bounded_by_window() {
    let mut broadcaster = make_broadcaster_with(HistoryBackend::memory(), 5);
    let state = state_for(&broadcaster);
    for _ in 0..8 {
        broadcaster.tick().await;
    }

    let json = body_to_json(get(state, "/history").await.into_body()).await;
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[0]["timestamp"], "2024-01-15 09:00:03 -03");
    assert_eq!(entries[4]["timestamp"], "2024-01-15 09:00:07 -03");
}

#[tokio::test]
async fn test_history_skips_malformed_entries() {
    let backend = HistoryBackend::memory();
    let mut broadcaster = make_broadcaster_with(backend.clone(), DEFAULT_WINDOW);
    let state = state_for(&broadcaster);

    broadcaster.tick().await;
    backend.append(DEFAULT_HISTORY_KEY, "garbage").await.unwrap();
    broadcaster.tick().await;

    let response = get(state, "/history").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_history_store_failure_is_503() {
    let store = MemoryStore::new();
    let broadcaster = make_broadcaster_with(HistoryBackend::Memory(store.clone()), DEFAULT_WINDOW);
    let state = state_for(&broadcaster);
    store.fail(StoreOp::Read, true);

    let response = get(Arc::clone(&state), "/history").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 503);
    assert!(json["error"].as_str().unwrap().contains("read"));

    let response = get(Arc::clone(&state), "/health").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    store.fail(StoreOp::Read, false);
    let response = get(state, "/history").await;
    assert_eq!(response.status(), StatusCode::OK);
}

// =========================================================================
// GET /stream
// =========================================================================

#[tokio::test]
async fn test_stream_headers_and_frames() {
    let mut broadcaster = make_broadcaster();
    let state = state_for(&broadcaster);
    let registry = broadcaster.registry();

    let response = get(Arc::clone(&state), "/stream").await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(
        headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert_eq!(headers[header::CONNECTION], "keep-alive");
    assert_eq!(registry.len(), 1);

    let mut body = response.into_body().into_data_stream();
    let report = broadcaster.tick().await;
    assert_eq!(report.delivered, 1);

    let frame = next_frame(&mut body).await;
    assert_eq!(frame["timestamp"], report.reading.timestamp.as_str());
    assert_two_decimal_string(&frame["temperature"]);

    drop(body);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_stream_disconnect_leaves_other_client_running() {
    let mut broadcaster = make_broadcaster();
    let state = state_for(&broadcaster);
    let registry = broadcaster.registry();

    let mut first = get(Arc::clone(&state), "/stream")
        .await
        .into_body()
        .into_data_stream();
    let mut second = get(Arc::clone(&state), "/stream")
        .await
        .into_body()
        .into_data_stream();
    assert_eq!(registry.len(), 2);

    broadcaster.tick().await;
    next_frame(&mut first).await;
    next_frame(&mut second).await;

    drop(first);
    let report = broadcaster.tick().await;
    assert_eq!(report.delivered, 1);
    let frame = next_frame(&mut second).await;
    assert_eq!(frame["timestamp"], "2024-01-15 09:00:01 -03");
}

#[tokio::test(start_paused = true)]
async fn test_three_ticks_streamed_and_stored() {
    let broadcaster = make_broadcaster();
    let state = state_for(&broadcaster);

    let mut body = get(Arc::clone(&state), "/stream")
        .await
        .into_body()
        .into_data_stream();
    let handle = broadcaster.spawn();

    let mut frames = Vec::new();
    for _ in 0..3 {
        frames.push(next_frame(&mut body).await);
    }
    handle.abort();
    drop(body);

    let json = body_to_json(get(state, "/history").await.into_body()).await;
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries, &frames);

    let stamps: Vec<&str> = entries
        .iter()
        .map(|e| e["timestamp"].as_str().unwrap())
        .collect();
    assert_eq!(
        stamps,
        vec![
            "2024-01-15 09:00:00 -03",
            "2024-01-15 09:00:01 -03",
            "2024-01-15 09:00:02 -03",
        ]
    );
    for entry in entries {
        assert_two_decimal_string(&entry["temperature"]);
    }
}

// =========================================================================
// GET /health and fallback
// =========================================================================

#[tokio::test]
async fn test_health_reports_counts() {
    let mut broadcaster = make_broadcaster();
    let state = state_for(&broadcaster);
    let _subscription = state.subscribe();
    broadcaster.tick().await;

    let response = get(state, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["subscribers"], 1);
    assert_eq!(json["history_len"], 1);
    assert_eq!(json["window"], DEFAULT_WINDOW);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let broadcaster = make_broadcaster();
    let response = get(state_for(&broadcaster), "/nope").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 404);
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test]
async fn test_shutdown_completes_with_stream_attached() {
    let broadcaster = make_broadcaster();
    let state = state_for(&broadcaster);
    let registry = Arc::clone(&state.registry);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(serve(listener, state, async {
        let _ = shutdown_rx.await;
    }));

    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"GET /stream HTTP/1.1\r\nHost: localhost\r\nAccept: text/event-stream\r\n\r\n")
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while registry.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("stream client never registered");

    shutdown_tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop while a stream was open");
    result.unwrap().unwrap();
    assert!(registry.is_empty());

    // The client sees the response end rather than a hung socket.
    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut received))
        .await
        .expect("client socket left open")
        .unwrap();
    let text = String::from_utf8_lossy(&received);
    assert!(text.starts_with("HTTP/1.1 200"), "unexpected response: {text:?}");
}
