//! Backend dispatch for the history store.
//!
//! [`HistoryBackend`] exposes the list contract the history window needs
//! (`append`, `trim_to_window`, `range_read`) over either a live
//! `Dragonfly` connection or the in-process [`MemoryStore`].
//!
//! Uses enum dispatch instead of trait objects because async methods
//! are not dyn-compatible in Rust.

use crate::dragonfly::DragonflyPool;
use crate::error::StoreError;
use crate::memory::MemoryStore;

/// A list store that holds the history window.
#[derive(Clone)]
pub enum HistoryBackend {
    /// Redis-compatible server reached over the network.
    Dragonfly(DragonflyPool),
    /// In-process store; contents are lost on restart.
    Memory(MemoryStore),
}

impl HistoryBackend {
    /// Connect to `Dragonfly` at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the URL is invalid or the server is
    /// unreachable.
    pub async fn dragonfly(url: &str) -> Result<Self, StoreError> {
        Ok(Self::Dragonfly(DragonflyPool::connect(url).await?))
    }

    /// Create an empty in-memory backend.
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// Append one serialized entry at the tail of `key`.
    ///
    /// Returns the list length after the append.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot serve the operation.
    pub async fn append(&self, key: &str, entry: &str) -> Result<u64, StoreError> {
        match self {
            Self::Dragonfly(pool) => pool.append(key, entry).await,
            Self::Memory(store) => store.append(key, entry).await,
        }
    }

    /// Retain only the last `window` entries of `key`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot serve the operation.
    pub async fn trim_to_window(&self, key: &str, window: usize) -> Result<(), StoreError> {
        match self {
            Self::Dragonfly(pool) => pool.trim_to_window(key, window).await,
            Self::Memory(store) => store.trim_to_window(key, window).await,
        }
    }

    /// Read entries `start..=end` of `key` in insertion order.
    ///
    /// `(0, -1)` returns the whole list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot serve the operation.
    pub async fn range_read(
        &self,
        key: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Dragonfly(pool) => pool.range_read(key, start, end).await,
            Self::Memory(store) => store.range_read(key, start, end).await,
        }
    }

    /// Number of entries currently stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot serve the operation.
    pub async fn len(&self, key: &str) -> Result<u64, StoreError> {
        match self {
            Self::Dragonfly(pool) => pool.len(key).await,
            Self::Memory(store) => store.len(key).await,
        }
    }

    /// Delete `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot serve the operation.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self {
            Self::Dragonfly(pool) => pool.delete(key).await,
            Self::Memory(store) => {
                store.delete(key).await;
                Ok(())
            }
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Dragonfly(_) => "dragonfly",
            Self::Memory(_) => "memory",
        }
    }
}
