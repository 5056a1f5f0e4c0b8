//! HTTP API for the thermofeed telemetry service.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Server-sent events** (`/stream`) pushing one JSON reading per tick
//!   to every connected client
//! - **History** (`/history`) returning the whole bounded window as a
//!   JSON array, oldest first
//! - **Health** (`/health`) reporting subscriber count and window fill
//!
//! # Architecture
//!
//! Handlers never generate readings. The tick loop in
//! [`thermofeed_core::Broadcaster`] owns generation and storage; this
//! crate only subscribes connections to its registry and reads the
//! history window it writes.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod stream;

// Re-export primary types for convenience.
pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, serve, start_server};
pub use state::AppState;
