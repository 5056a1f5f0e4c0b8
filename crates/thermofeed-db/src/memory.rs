//! In-process history store with Redis list semantics.
//!
//! Used by tests and by the `memory` backend when no `Dragonfly` instance
//! is available. Index handling mirrors `LRANGE`: negative indices count
//! from the tail and out-of-range bounds are clamped.
//!
//! Individual operations can be switched to fail with
//! [`MemoryStore::fail`], which lets callers exercise their handling of
//! an unavailable store without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::error::StoreError;

/// A list operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// `append` (`RPUSH`).
    Append,
    /// `trim_to_window` (`LTRIM`).
    Trim,
    /// `range_read` and `len` (`LRANGE`, `LLEN`).
    Read,
}

impl StoreOp {
    const fn name(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Trim => "trim",
            Self::Read => "read",
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    append: AtomicBool,
    trim: AtomicBool,
    read: AtomicBool,
}

impl Faults {
    const fn flag(&self, op: StoreOp) -> &AtomicBool {
        match op {
            StoreOp::Append => &self.append,
            StoreOp::Trim => &self.trim,
            StoreOp::Read => &self.read,
        }
    }
}

/// Shared in-memory list store.
///
/// Cloning yields another handle to the same lists. Each operation holds
/// the lock for its whole duration, so readers never see a partial write.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    lists: Arc<RwLock<HashMap<String, VecDeque<String>>>>,
    faults: Arc<Faults>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` fail with [`StoreError::Unavailable`] until called again
    /// with `failing = false`. Shared by every clone of this store.
    pub fn fail(&self, op: StoreOp, failing: bool) {
        self.faults.flag(op).store(failing, Ordering::SeqCst);
    }

    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.faults.flag(op).load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(op.name()))
        } else {
            Ok(())
        }
    }

    /// Append `entry` at the tail of `key`, returning the new length.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] while appends are failing.
    pub async fn append(&self, key: &str, entry: &str) -> Result<u64, StoreError> {
        self.check(StoreOp::Append)?;
        let mut lists = self.lists.write().await;
        let list = lists.entry(key.to_owned()).or_default();
        list.push_back(entry.to_owned());
        Ok(u64::try_from(list.len()).unwrap_or(u64::MAX))
    }

    /// Drop entries from the head of `key` until at most `window` remain.
    ///
    /// An emptied list is removed, matching Redis.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] while trims are failing.
    pub async fn trim_to_window(&self, key: &str, window: usize) -> Result<(), StoreError> {
        self.check(StoreOp::Trim)?;
        let mut lists = self.lists.write().await;
        let Some(list) = lists.get_mut(key) else {
            return Ok(());
        };
        let excess = list.len().saturating_sub(window);
        list.drain(..excess);
        if list.is_empty() {
            lists.remove(key);
        }
        Ok(())
    }

    /// Read entries `start..=end` of `key` using `LRANGE` index rules.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] while reads are failing.
    pub async fn range_read(
        &self,
        key: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<String>, StoreError> {
        self.check(StoreOp::Read)?;
        let lists = self.lists.read().await;
        let Some(list) = lists.get(key) else {
            return Ok(Vec::new());
        };
        Ok(
            resolve_range(list.len(), start, end).map_or_else(Vec::new, |(first, last)| {
                list.iter()
                    .skip(first)
                    .take(last.saturating_sub(first).saturating_add(1))
                    .cloned()
                    .collect()
            }),
        )
    }

    /// Number of entries in `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] while reads are failing.
    pub async fn len(&self, key: &str) -> Result<u64, StoreError> {
        self.check(StoreOp::Read)?;
        let lists = self.lists.read().await;
        Ok(lists
            .get(key)
            .map_or(0, |list| u64::try_from(list.len()).unwrap_or(u64::MAX)))
    }

    /// Remove `key` entirely.
    pub async fn delete(&self, key: &str) {
        self.lists.write().await.remove(key);
    }
}

/// Translate `LRANGE`-style inclusive bounds into concrete indices.
///
/// Returns `None` when the range selects nothing.
fn resolve_range(len: usize, start: i64, end: i64) -> Option<(usize, usize)> {
    let len_i = i64::try_from(len).ok()?;
    if len_i == 0 {
        return None;
    }
    let start = if start < 0 { len_i.saturating_add(start) } else { start };
    let end = if end < 0 { len_i.saturating_add(end) } else { end };
    let start = start.max(0);
    let end = end.min(len_i.saturating_sub(1));
    if start > end || start >= len_i {
        return None;
    }
    Some((usize::try_from(start).ok()?, usize::try_from(end).ok()?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn filled(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..n {
            store.append("k", &i.to_string()).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn append_returns_new_length() {
        let store = MemoryStore::new();
        assert_eq!(store.append("k", "a").await.unwrap(), 1);
        assert_eq!(store.append("k", "b").await.unwrap(), 2);
        assert_eq!(store.len("k").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn full_range_returns_insertion_order() {
        let store = filled(4).await;
        assert_eq!(store.range_read("k", 0, -1).await.unwrap(), vec!["0", "1", "2", "3"]);
    }

    #[tokio::test]
    async fn negative_and_clamped_indices() {
        let store = filled(5).await;
        assert_eq!(store.range_read("k", -2, -1).await.unwrap(), vec!["3", "4"]);
        assert_eq!(store.range_read("k", 1, 2).await.unwrap(), vec!["1", "2"]);
        assert_eq!(store.range_read("k", -100, 100).await.unwrap().len(), 5);
        assert!(store.range_read("k", 3, 1).await.unwrap().is_empty());
        assert!(store.range_read("k", 10, 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_key_reads_empty() {
        let store = MemoryStore::new();
        assert!(store.range_read("nope", 0, -1).await.unwrap().is_empty());
        assert_eq!(store.len("nope").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn trim_keeps_newest_entries() {
        let store = filled(10).await;
        store.trim_to_window("k", 3).await.unwrap();
        assert_eq!(store.range_read("k", 0, -1).await.unwrap(), vec!["7", "8", "9"]);
    }

    #[tokio::test]
    async fn trim_is_idempotent() {
        let store = filled(10).await;
        store.trim_to_window("k", 4).await.unwrap();
        let first = store.range_read("k", 0, -1).await.unwrap();
        store.trim_to_window("k", 4).await.unwrap();
        assert_eq!(store.range_read("k", 0, -1).await.unwrap(), first);
    }

    #[tokio::test]
    async fn trim_to_zero_removes_key() {
        let store = filled(3).await;
        store.trim_to_window("k", 0).await.unwrap();
        assert_eq!(store.len("k").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn trim_larger_than_list_is_noop() {
        let store = filled(2).await;
        store.trim_to_window("k", 86_400).await.unwrap();
        assert_eq!(store.len("k").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn failing_operations_report_unavailable() {
        let store = filled(3).await;
        let handle = store.clone();
        handle.fail(StoreOp::Read, true);
        assert!(matches!(
            store.range_read("k", 0, -1).await,
            Err(StoreError::Unavailable("read"))
        ));
        assert!(store.len("k").await.is_err());

        store.fail(StoreOp::Append, true);
        assert!(store.append("k", "x").await.is_err());
        store.fail(StoreOp::Trim, true);
        assert!(store.trim_to_window("k", 1).await.is_err());

        store.fail(StoreOp::Read, false);
        assert_eq!(store.range_read("k", 0, -1).await.unwrap(), vec!["0", "1", "2"]);
    }

    #[test]
    fn resolve_range_empty_list() {
        assert_eq!(resolve_range(0, 0, -1), None);
        assert_eq!(resolve_range(3, 0, -1), Some((0, 2)));
    }
}
