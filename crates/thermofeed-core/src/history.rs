//! Bounded history window over the list store.
//!
//! [`HistoryLog`] enforces the window policy: every append is immediately
//! followed by a trim on the same key so the list never holds more than
//! `window` entries once a cycle completes. The two calls are issued in
//! strict sequence but are not transactional. A failed trim is logged and
//! left for the next cycle to repair.

use thermofeed_db::{HistoryBackend, StoreError};
use tracing::{debug, warn};

use crate::reading::Reading;

/// Number of readings retained: one day at one reading per second.
pub const DEFAULT_WINDOW: usize = 86_400;

/// List key holding the serialized readings.
pub const DEFAULT_HISTORY_KEY: &str = "temperatures";

/// Errors surfaced by the history window.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The store could not be reached or rejected the command.
    #[error("history store error: {0}")]
    Store(#[from] StoreError),

    /// A reading could not be serialized for storage.
    #[error("reading serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Append-then-trim view of one list key.
///
/// Cheap to clone; all clones share the backend connection.
#[derive(Clone)]
pub struct HistoryLog {
    backend: HistoryBackend,
    key: String,
    window: usize,
}

impl HistoryLog {
    /// Window over `key` retaining at most `window` readings.
    pub fn new(backend: HistoryBackend, key: impl Into<String>, window: usize) -> Self {
        Self {
            backend,
            key: key.into(),
            window,
        }
    }

    /// Serialize `reading`, append it, then trim the list to the window.
    ///
    /// Returns the list length observed right after the append.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError`] if serialization or the append fails. A
    /// trim failure is logged and does not fail the call.
    pub async fn record(&self, reading: &Reading) -> Result<u64, HistoryError> {
        let entry = serde_json::to_string(reading)?;
        let len = self.backend.append(&self.key, &entry).await?;

        if let Err(e) = self.backend.trim_to_window(&self.key, self.window).await {
            warn!(key = %self.key, window = self.window, error = %e, "history trim failed");
        }

        Ok(len)
    }

    /// Read the whole window, oldest first.
    ///
    /// Entries that fail to deserialize are skipped with a warning rather
    /// than failing the read.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Store`] if the range read fails.
    pub async fn readings(&self) -> Result<Vec<Reading>, HistoryError> {
        let entries = self.backend.range_read(&self.key, 0, -1).await?;
        let mut readings = Vec::with_capacity(entries.len());
        let mut skipped: usize = 0;
        for entry in &entries {
            match serde_json::from_str::<Reading>(entry) {
                Ok(reading) => readings.push(reading),
                Err(e) => {
                    skipped = skipped.saturating_add(1);
                    warn!(key = %self.key, error = %e, "skipping malformed history entry");
                }
            }
        }
        debug!(key = %self.key, returned = readings.len(), skipped, "history read");
        Ok(readings)
    }

    /// Current number of stored entries.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Store`] if the store cannot be queried.
    pub async fn len(&self) -> Result<u64, HistoryError> {
        Ok(self.backend.len(&self.key).await?)
    }

    /// Trim the list to the window without appending.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Store`] if the trim fails.
    pub async fn trim(&self) -> Result<(), HistoryError> {
        Ok(self.backend.trim_to_window(&self.key, self.window).await?)
    }

    /// The list key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Maximum number of retained readings.
    pub const fn window(&self) -> usize {
        self.window
    }

    /// The underlying store.
    pub const fn backend(&self) -> &HistoryBackend {
        &self.backend
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use thermofeed_db::{MemoryStore, StoreOp};

    use super::*;
    use crate::clock::SteppingTimeSource;
    use crate::reading::ReadingGenerator;

    fn generator() -> ReadingGenerator {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        ReadingGenerator::seeded(3, Arc::new(SteppingTimeSource::new(start, 1_000)))
    }

    #[tokio::test]
    async fn empty_history_reads_empty() {
        let log = HistoryLog::new(HistoryBackend::memory(), DEFAULT_HISTORY_KEY, DEFAULT_WINDOW);
        assert!(log.readings().await.unwrap().is_empty());
        assert_eq!(log.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn records_in_tick_order() {
        let log = HistoryLog::new(HistoryBackend::memory(), "h", DEFAULT_WINDOW);
        let mut generator = generator();
        let mut written = Vec::new();
        for _ in 0..5 {
            let reading = generator.generate();
            log.record(&reading).await.unwrap();
            written.push(reading);
        }
        assert_eq!(log.readings().await.unwrap(), written);
    }

    #[tokio::test]
    async fn window_bound_holds_after_every_cycle() {
        let log = HistoryLog::new(HistoryBackend::memory(), "h", 10);
        let mut generator = generator();
        let mut last = None;
        for _ in 0..25 {
            let reading = generator.generate();
            log.record(&reading).await.unwrap();
            assert!(log.len().await.unwrap() <= 10);
            last = Some(reading);
        }
        let kept = log.readings().await.unwrap();
        assert_eq!(kept.len(), 10);
        assert_eq!(kept.last(), last.as_ref());
    }

    #[tokio::test]
    async fn trim_twice_is_idempotent() {
        let log = HistoryLog::new(HistoryBackend::memory(), "h", 3);
        let mut generator = generator();
        for _ in 0..3 {
            log.record(&generator.generate()).await.unwrap();
        }
        log.trim().await.unwrap();
        let once = log.readings().await.unwrap();
        log.trim().await.unwrap();
        assert_eq!(log.readings().await.unwrap(), once);
    }

    #[tokio::test]
    async fn malformed_entries_are_skipped() {
        let backend = HistoryBackend::memory();
        let log = HistoryLog::new(backend.clone(), "h", DEFAULT_WINDOW);
        let mut generator = generator();

        log.record(&generator.generate()).await.unwrap();
        backend.append("h", "{not json").await.unwrap();
        log.record(&generator.generate()).await.unwrap();

        let readings = log.readings().await.unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(log.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn trim_failure_keeps_the_append() {
        let store = MemoryStore::new();
        let log = HistoryLog::new(HistoryBackend::Memory(store.clone()), "h", 2);
        let mut generator = generator();
        for _ in 0..2 {
            log.record(&generator.generate()).await.unwrap();
        }

        store.fail(StoreOp::Trim, true);
        let extra = generator.generate();
        assert_eq!(log.record(&extra).await.unwrap(), 3);
        assert_eq!(log.len().await.unwrap(), 3);
        assert!(log.trim().await.is_err());

        // The next successful cycle restores the bound.
        store.fail(StoreOp::Trim, false);
        let next = generator.generate();
        log.record(&next).await.unwrap();
        assert_eq!(log.readings().await.unwrap(), vec![extra, next]);
    }

    #[tokio::test]
    async fn append_failure_is_returned() {
        let store = MemoryStore::new();
        let log = HistoryLog::new(HistoryBackend::Memory(store.clone()), "h", DEFAULT_WINDOW);
        store.fail(StoreOp::Append, true);
        let err = log.record(&generator().generate()).await.unwrap_err();
        assert!(matches!(err, HistoryError::Store(StoreError::Unavailable("append"))));
        store.fail(StoreOp::Append, false);
        assert_eq!(log.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn read_failure_is_returned() {
        let store = MemoryStore::new();
        let log = HistoryLog::new(HistoryBackend::Memory(store.clone()), "h", DEFAULT_WINDOW);
        store.fail(StoreOp::Read, true);
        assert!(log.readings().await.is_err());
        assert!(log.len().await.is_err());
    }
}
