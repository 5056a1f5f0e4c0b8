//! Core of the thermofeed telemetry service.
//!
//! A single producer generates one synthetic temperature reading per
//! tick, appends it to a bounded history window and pushes it to every
//! live subscriber.
//!
//! # Tick Pipeline
//!
//! ```text
//! timer tick
//!     |
//!     +-- ReadingGenerator::generate()     (clock + random source)
//!     |
//!     +-- HistoryLog::record()             (append, then trim to window)
//!     |
//!     +-- SubscriberRegistry::broadcast()  (fan-out to live connections)
//! ```
//!
//! # Modules
//!
//! - [`clock`] -- Fixed-timezone timestamp formatting and time sources
//! - [`reading`] -- The [`Reading`] type and its generator
//! - [`history`] -- Append-then-trim history window
//! - [`registry`] -- Live subscriber set and per-connection channels
//! - [`broadcaster`] -- Shared tick loop with Idle/Active states
//! - [`config`] -- YAML + environment configuration

pub mod broadcaster;
pub mod clock;
pub mod config;
pub mod history;
pub mod reading;
pub mod registry;

// Re-export primary types for convenience.
pub use broadcaster::{Broadcaster, BroadcasterState, TickReport};
pub use clock::{SystemTimeSource, TimeSource, format_timestamp};
pub use config::{ConfigError, FeedConfig, StoreBackendKind};
pub use history::{HistoryError, HistoryLog};
pub use reading::{Reading, ReadingGenerator};
pub use registry::{SubscriberId, SubscriberRegistry, Subscription};
