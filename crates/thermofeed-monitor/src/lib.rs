//! Monitoring client for the thermofeed telemetry service.
//!
//! Fetches the stored history, consumes the live stream, and reports
//! statistics plus readings that fall outside a configurable safe band.
//!
//! # Modules
//!
//! - [`client`] -- `reqwest` client for `/history` and `/stream`
//! - [`sse`] -- incremental server-sent events decoder
//! - [`stats`] -- statistics and safety classification
//! - [`config`] -- environment-driven configuration
//! - [`error`] -- error types

pub mod client;
pub mod config;
pub mod error;
pub mod sse;
pub mod stats;

pub use client::ApiClient;
pub use config::{MonitorConfig, MonitorMode};
pub use error::MonitorError;
pub use sse::SseDecoder;
pub use stats::{HISTORY_SAMPLE_SIZE, Safety, Stats, TemperatureMonitor, history_sample};
