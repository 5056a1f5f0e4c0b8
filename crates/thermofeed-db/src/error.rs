//! Error types for the history store.
//!
//! All errors are propagated via [`StoreError`] which wraps the underlying
//! [`fred`] errors with context about which operation failed.

/// Errors that can occur in the history store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A configuration error (bad URL, unknown backend).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The in-memory store was told to fail this operation.
    #[error("store unavailable during {0}")]
    Unavailable(&'static str),
}
