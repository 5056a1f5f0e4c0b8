//! Timestamp formatting in the feed's fixed timezone.
//!
//! Every reading carries a wall-clock timestamp rendered in
//! `America/Araguaina`, independent of the host's local timezone. The
//! zone database is compiled into the binary, so formatting cannot fail.
//!
//! "Now" is obtained through a [`TimeSource`] so the tick loop can be
//! driven with deterministic instants.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Timezone all reading timestamps are expressed in.
pub const FEED_TIMEZONE: Tz = chrono_tz::America::Araguaina;

/// `strftime` pattern for reading timestamps: 24-hour fields plus the
/// short zone label.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Render `instant` in [`FEED_TIMEZONE`].
///
/// Produces strings such as `2024-01-15 09:00:00 -03`. The output sorts
/// lexicographically in chronological order for instants within the
/// same UTC offset.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&FEED_TIMEZONE)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Source of the current instant.
pub trait TimeSource: Send + Sync {
    /// The current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic source that advances by a fixed step on every call.
///
/// The first call returns `start`; each following call returns the
/// previous instant plus `step_millis`. Used to replay ticks with exact
/// one-second spacing.
#[derive(Debug)]
pub struct SteppingTimeSource {
    next_millis: AtomicI64,
    step_millis: i64,
}

impl SteppingTimeSource {
    /// Create a source starting at `start` and advancing `step_millis`
    /// per call.
    pub fn new(start: DateTime<Utc>, step_millis: i64) -> Self {
        Self {
            next_millis: AtomicI64::new(start.timestamp_millis()),
            step_millis,
        }
    }
}

impl TimeSource for SteppingTimeSource {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.next_millis.fetch_add(self.step_millis, Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn instant(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, s).unwrap()
    }

    #[test]
    fn formats_in_araguaina_offset() {
        assert_eq!(format_timestamp(instant(12, 0, 0)), "2024-01-15 09:00:00 -03");
    }

    #[test]
    fn uses_24_hour_fields() {
        assert_eq!(format_timestamp(instant(23, 59, 59)), "2024-01-15 20:59:59 -03");
    }

    #[test]
    fn crosses_day_boundary_in_local_zone() {
        assert_eq!(format_timestamp(instant(1, 30, 5)), "2024-01-14 22:30:05 -03");
    }

    #[test]
    fn formatting_is_deterministic() {
        let t = instant(8, 15, 42);
        assert_eq!(format_timestamp(t), format_timestamp(t));
    }

    #[test]
    fn stepping_source_advances_by_step() {
        let source = SteppingTimeSource::new(instant(12, 0, 0), 1_000);
        assert_eq!(source.now(), instant(12, 0, 0));
        assert_eq!(source.now(), instant(12, 0, 1));
        assert_eq!(source.now(), instant(12, 0, 2));
    }

    #[test]
    fn system_source_is_close_to_now() {
        let before = Utc::now();
        let now = SystemTimeSource.now();
        assert!(now >= before);
    }
}
