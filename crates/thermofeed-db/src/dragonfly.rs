//! `Dragonfly` (Redis-compatible) list operations backing the history window.
//!
//! The history window is a single Redis list. Readings are appended at the
//! tail with `RPUSH`, the window bound is enforced with `LTRIM key -W -1`
//! and the full window is read back with `LRANGE key 0 -1`.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `{history_key}` | List | Serialized readings, oldest first |

use fred::prelude::*;

use crate::error::StoreError;

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
///
/// Wraps a [`fred::prelude::Client`]. Cloning is cheap and every clone
/// shares the same underlying connection.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed.
    /// Returns [`StoreError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!(url, "Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Append `entry` at the tail of the list at `key` (`RPUSH`).
    ///
    /// Returns the list length after the push.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the write fails.
    pub async fn append(&self, key: &str, entry: &str) -> Result<u64, StoreError> {
        let len: u64 = self.client.rpush(key, entry).await?;
        Ok(len)
    }

    /// Keep only the last `window` entries of the list (`LTRIM key -W -1`).
    ///
    /// A window of zero deletes the key, since `LTRIM key 0 -1` would keep
    /// everything.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the trim fails.
    pub async fn trim_to_window(&self, key: &str, window: usize) -> Result<(), StoreError> {
        if window == 0 {
            let _: u32 = self.client.del(key).await?;
            return Ok(());
        }
        let start = i64::try_from(window).map_or(i64::MIN, |w| 0_i64.saturating_sub(w));
        let _: () = self.client.ltrim(key, start, -1).await?;
        Ok(())
    }

    /// Read the entries between `start` and `end` inclusive (`LRANGE`).
    ///
    /// Negative indices count from the tail, so `(0, -1)` is the whole list.
    /// Returns entries in insertion order (oldest first).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the read fails.
    pub async fn range_read(
        &self,
        key: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<String>, StoreError> {
        let values: Vec<String> = self.client.lrange(key, start, end).await?;
        Ok(values)
    }

    /// Number of entries in the list at `key` (`LLEN`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the read fails.
    pub async fn len(&self, key: &str) -> Result<u64, StoreError> {
        let len: u64 = self.client.llen(key).await?;
        Ok(len)
    }

    /// Delete the list at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _: u32 = self.client.del(key).await?;
        Ok(())
    }

    /// Close the connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Dragonfly`] if the `QUIT` command fails.
    pub async fn quit(&self) -> Result<(), StoreError> {
        self.client.quit().await?;
        Ok(())
    }

    /// Return a reference to the underlying [`Client`].
    pub const fn client(&self) -> &Client {
        &self.client
    }
}
