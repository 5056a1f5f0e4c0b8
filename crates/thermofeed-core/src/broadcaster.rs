//! The shared tick loop.
//!
//! One [`Broadcaster`] owns the reading generator, the history window and
//! the subscriber registry. While at least one subscriber is registered it
//! ticks on a fixed cadence; each tick generates a reading, appends it to
//! history (append then trim) and fans it out to every subscriber.
//!
//! # States
//!
//! ```text
//!            first subscriber
//!   Idle ----------------------> Active
//!    ^                              |
//!    +------------------------------+
//!            last subscriber leaves
//! ```
//!
//! No readings are generated or stored while `Idle`. A single timer drives
//! both storage and fan-out regardless of how many clients are connected,
//! so history receives exactly one entry per tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::history::HistoryLog;
use crate::reading::{Reading, ReadingGenerator};
use crate::registry::SubscriberRegistry;

/// Default tick cadence.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Whether the tick loop is currently producing readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcasterState {
    /// No subscribers; the timer is stopped.
    Idle,
    /// At least one subscriber; ticking on the cadence.
    Active,
}

/// Result of a single tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Sequence number of the tick, starting at 1.
    pub tick: u64,
    /// The reading generated for this tick.
    pub reading: Arc<Reading>,
    /// Whether the reading reached the history store.
    pub stored: bool,
    /// Number of subscribers the reading was pushed to.
    pub delivered: usize,
}

/// Drives generation, storage and fan-out from a single timer.
pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
    history: HistoryLog,
    generator: ReadingGenerator,
    interval: Duration,
    ticks: u64,
    state: watch::Sender<BroadcasterState>,
}

impl Broadcaster {
    /// Create an idle broadcaster ticking every [`TICK_INTERVAL`].
    pub fn new(
        registry: Arc<SubscriberRegistry>,
        history: HistoryLog,
        generator: ReadingGenerator,
    ) -> Self {
        let (state, _) = watch::channel(BroadcasterState::Idle);
        Self {
            registry,
            history,
            generator,
            interval: TICK_INTERVAL,
            ticks: 0,
            state,
        }
    }

    /// Override the tick cadence. A zero interval falls back to
    /// [`TICK_INTERVAL`].
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = if interval.is_zero() {
            TICK_INTERVAL
        } else {
            interval
        };
        self
    }

    /// The registry connections subscribe through.
    pub fn registry(&self) -> Arc<SubscriberRegistry> {
        Arc::clone(&self.registry)
    }

    /// The history window written by this broadcaster.
    pub const fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Observe Idle/Active transitions.
    pub fn watch_state(&self) -> watch::Receiver<BroadcasterState> {
        self.state.subscribe()
    }

    /// Number of ticks executed so far.
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Execute one tick: generate, store, then broadcast.
    ///
    /// If the append fails the reading is not pushed; the failure is
    /// logged and the next tick proceeds normally.
    pub async fn tick(&mut self) -> TickReport {
        self.ticks = self.ticks.saturating_add(1);
        let reading = Arc::new(self.generator.generate());

        let stored = match self.history.record(&reading).await {
            Ok(history_len) => {
                debug!(
                    tick = self.ticks,
                    history_len,
                    temperature = %reading.temperature,
                    timestamp = %reading.timestamp,
                    "reading stored"
                );
                true
            }
            Err(e) => {
                error!(tick = self.ticks, error = %e, "failed to store reading, skipping push");
                false
            }
        };

        let delivered = if stored {
            self.registry.broadcast(&reading)
        } else {
            0
        };

        TickReport {
            tick: self.ticks,
            reading,
            stored,
            delivered,
        }
    }

    /// Run the tick loop forever, idling whenever nobody is subscribed.
    ///
    /// The first activation ticks immediately. Later activations never
    /// tick sooner than one interval after the previous tick.
    pub async fn run(mut self) {
        let mut count = self.registry.watch_count();
        let mut last_tick: Option<Instant> = None;

        loop {
            if count.wait_for(|n| *n > 0).await.is_err() {
                return;
            }
            self.state.send_replace(BroadcasterState::Active);
            info!(
                subscribers = self.registry.len(),
                interval = ?self.interval,
                "tick loop active"
            );

            let now = Instant::now();
            let start = last_tick
                .and_then(|t| t.checked_add(self.interval))
                .map_or(now, |next| next.max(now));
            let mut ticker = time::interval_at(start, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    changed = count.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        if *count.borrow_and_update() == 0 {
                            break;
                        }
                    }
                    at = ticker.tick() => {
                        if self.registry.is_empty() {
                            break;
                        }
                        last_tick = Some(at);
                        self.tick().await;
                    }
                }
            }

            self.state.send_replace(BroadcasterState::Idle);
            info!(ticks = self.ticks, "tick loop idle");
        }
    }

    /// Spawn [`Broadcaster::run`] on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("interval", &self.interval)
            .field("ticks", &self.ticks)
            .field("subscribers", &self.registry.len())
            .finish_non_exhaustive()
    }
}
