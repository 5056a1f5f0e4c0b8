//! Live subscriber registry.
//!
//! Each connected stream client holds a [`Subscription`]: the receiving
//! half of a bounded per-connection channel. The registry keeps the
//! sending halves keyed by [`SubscriberId`] and fans every tick's reading
//! out to all of them.
//!
//! # Concurrency
//!
//! Membership lives behind a short-lived mutex. [`SubscriberRegistry::broadcast`]
//! snapshots the sender set under the lock and delivers outside it, so
//! connects and disconnects never wait on a broadcast and a broadcast
//! always completes for the remaining set. A subscriber that leaves
//! mid-broadcast either gets that one reading or does not.
//!
//! The subscriber count is published on a [`watch`] channel so the tick
//! loop can idle while nobody is listening.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::reading::Reading;

/// Readings buffered per subscriber before frames are dropped for it.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 16;

/// Identifier of one live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(pub Uuid);

impl SubscriberId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

type ReadingSender = mpsc::Sender<Arc<Reading>>;

/// Set of live subscribers.
#[derive(Debug)]
pub struct SubscriberRegistry {
    subscribers: Mutex<HashMap<SubscriberId, ReadingSender>>,
    count: watch::Sender<usize>,
    buffer: usize,
}

impl SubscriberRegistry {
    /// Create an empty registry whose subscriptions buffer `buffer`
    /// readings each (at least one).
    pub fn new(buffer: usize) -> Arc<Self> {
        let (count, _) = watch::channel(0);
        Arc::new(Self {
            subscribers: Mutex::new(HashMap::new()),
            count,
            buffer: buffer.max(1),
        })
    }

    /// Register a new connection.
    ///
    /// Dropping the returned [`Subscription`] unsubscribes it.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = SubscriberId::new();
        let total = {
            let mut subscribers = self.lock();
            subscribers.insert(id, tx);
            self.count.send_replace(subscribers.len());
            subscribers.len()
        };
        debug!(%id, total, "subscriber registered");
        Subscription {
            id,
            rx,
            registry: Arc::downgrade(self),
        }
    }

    /// Remove a connection. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let (removed, total) = {
            let mut subscribers = self.lock();
            let removed = subscribers.remove(&id).is_some();
            self.count.send_replace(subscribers.len());
            (removed, subscribers.len())
        };
        if removed {
            debug!(%id, total, "subscriber removed");
        }
        removed
    }

    /// Push `reading` to every registered connection.
    ///
    /// Returns the number of connections that accepted it. A connection
    /// whose receiver is gone is unsubscribed; a connection whose buffer
    /// is full misses this reading only.
    pub fn broadcast(&self, reading: &Arc<Reading>) -> usize {
        let targets: Vec<(SubscriberId, ReadingSender)> = self
            .lock()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered: usize = 0;
        for (id, tx) in targets {
            match tx.try_send(Arc::clone(reading)) {
                Ok(()) => delivered = delivered.saturating_add(1),
                Err(TrySendError::Full(_)) => {
                    warn!(%id, "subscriber lagging, dropping reading");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(%id, "subscriber channel closed during broadcast");
                    self.unsubscribe(id);
                }
            }
        }
        delivered
    }

    /// Remove every subscriber at once.
    ///
    /// Each [`Subscription`] drains what is already buffered and then
    /// sees the end of its stream. Returns how many were removed.
    pub fn close_all(&self) -> usize {
        let closed = {
            let mut subscribers = self.lock();
            let closed = subscribers.len();
            subscribers.clear();
            self.count.send_replace(0);
            closed
        };
        debug!(closed, "all subscribers closed");
        closed
    }

    /// Number of live subscribers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Watch the subscriber count.
    pub fn watch_count(&self) -> watch::Receiver<usize> {
        self.count.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberId, ReadingSender>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle held by one connected client.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Arc<Reading>>,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    /// This subscription's identifier.
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next reading.
    ///
    /// Returns `None` once the subscription has been removed from the
    /// registry and all buffered readings are consumed.
    pub async fn recv(&mut self) -> Option<Arc<Reading>> {
        self.rx.recv().await
    }

    /// Take a buffered reading without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Reading>> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(self.id);
        }
    }
}
