//! Synthetic sensor readings.
//!
//! A [`Reading`] is one temperature sample plus its formatted timestamp.
//! The temperature is a [`Decimal`] with exactly two fractional digits and
//! serializes as a JSON string (`"42.07"`), so the scale survives the
//! round trip through the history store.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::clock::{SystemTimeSource, TimeSource, format_timestamp};

/// Number of fractional digits carried by every temperature.
pub const TEMPERATURE_SCALE: u32 = 2;

/// Upper bound of the generated range, in hundredths of a degree.
const MAX_HUNDREDTHS: i64 = 10_000;

/// One temperature sample. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    /// Temperature in degrees, scale 2, within `[0.00, 100.00]`.
    pub temperature: Decimal,
    /// Capture time rendered by [`format_timestamp`].
    pub timestamp: String,
}

impl Reading {
    /// Lowest temperature the generator can produce.
    pub const MIN_TEMPERATURE: Decimal = Decimal::ZERO;

    /// Highest temperature the generator can produce.
    pub const MAX_TEMPERATURE: Decimal = Decimal::ONE_HUNDRED;

    /// Whether the temperature lies in the generator's range with the
    /// expected two-digit scale.
    pub fn is_well_formed(&self) -> bool {
        self.temperature.scale() == TEMPERATURE_SCALE
            && self.temperature >= Self::MIN_TEMPERATURE
            && self.temperature <= Self::MAX_TEMPERATURE
    }
}

/// Produces one [`Reading`] per call.
///
/// The random source is the only state carried between calls; the
/// timestamp is taken from the [`TimeSource`] at call time.
pub struct ReadingGenerator {
    rng: StdRng,
    time: Arc<dyn TimeSource>,
}

impl ReadingGenerator {
    /// Generator seeded from the operating system, stamped with the
    /// system clock.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            time: Arc::new(SystemTimeSource),
        }
    }

    /// Reproducible generator for tests and replays.
    pub fn seeded(seed: u64, time: Arc<dyn TimeSource>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            time,
        }
    }

    /// Produce the next reading.
    pub fn generate(&mut self) -> Reading {
        let hundredths: i64 = self.rng.random_range(0..=MAX_HUNDREDTHS);
        Reading {
            temperature: Decimal::new(hundredths, TEMPERATURE_SCALE),
            timestamp: format_timestamp(self.time.now()),
        }
    }
}

impl Default for ReadingGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReadingGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingGenerator").finish_non_exhaustive()
    }
}
