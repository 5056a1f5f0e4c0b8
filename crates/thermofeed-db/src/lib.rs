//! History store for the thermofeed telemetry service.
//!
//! The history window is a single append-only list capped to the most
//! recent readings. This crate provides the list operations the window
//! policy needs, against `Dragonfly` (Redis-compatible) or an in-process
//! store with identical index semantics.
//!
//! # Modules
//!
//! - [`dragonfly`] -- `Dragonfly` list operations (`RPUSH`/`LTRIM`/`LRANGE`)
//! - [`memory`] -- In-process store for tests and local runs
//! - [`store`] -- [`HistoryBackend`] dispatch over both
//! - [`error`] -- Shared error types

pub mod dragonfly;
pub mod error;
pub mod memory;
pub mod store;

// Re-export primary types for convenience.
pub use dragonfly::DragonflyPool;
pub use error::StoreError;
pub use memory::{MemoryStore, StoreOp};
pub use store::HistoryBackend;
