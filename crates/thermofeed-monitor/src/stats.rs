//! Reading statistics and safety classification.
//!
//! [`TemperatureMonitor`] accumulates readings and answers two questions:
//! what do the numbers look like (count, min, max, mean) and which
//! readings fall outside the safe band.

use rust_decimal::Decimal;
use thermofeed_core::Reading;

/// Default lower edge of the safe band, in degrees.
pub const DEFAULT_SAFE_MIN: Decimal = Decimal::from_parts(20, 0, 0, false, 0);

/// Default upper edge of the safe band, in degrees.
pub const DEFAULT_SAFE_MAX: Decimal = Decimal::from_parts(80, 0, 0, false, 0);

/// Summary statistics. All values are `None` when no readings exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    /// Number of readings.
    pub count: usize,
    /// Lowest temperature.
    pub min: Option<Decimal>,
    /// Highest temperature.
    pub max: Option<Decimal>,
    /// Arithmetic mean, rounded to two decimals.
    pub mean: Option<Decimal>,
}

/// Where a reading sits relative to the safe band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Safety {
    /// Strictly below the band.
    Below,
    /// Strictly above the band.
    Above,
    /// Exactly on one of the edges.
    Boundary,
    /// Strictly inside the band.
    Ok,
}

impl Safety {
    /// Short label for log lines.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Below => "BELOW safe_min",
            Self::Above => "ABOVE safe_max",
            Self::Boundary => "AT boundary",
            Self::Ok => "ok",
        }
    }
}

/// Accumulates readings and reports on them.
#[derive(Debug, Clone)]
pub struct TemperatureMonitor {
    safe_min: Decimal,
    safe_max: Decimal,
    readings: Vec<Reading>,
}

impl TemperatureMonitor {
    /// Monitor with the given safe band.
    pub const fn new(safe_min: Decimal, safe_max: Decimal) -> Self {
        Self {
            safe_min,
            safe_max,
            readings: Vec::new(),
        }
    }

    /// Lower edge of the safe band.
    pub const fn safe_min(&self) -> Decimal {
        self.safe_min
    }

    /// Upper edge of the safe band.
    pub const fn safe_max(&self) -> Decimal {
        self.safe_max
    }

    /// Readings collected so far.
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Add a single reading.
    pub fn add_reading(&mut self, reading: Reading) {
        self.readings.push(reading);
    }

    /// Add many readings, keeping their order.
    pub fn add_readings(&mut self, readings: impl IntoIterator<Item = Reading>) {
        self.readings.extend(readings);
    }

    /// Count, min, max and mean over all readings.
    pub fn compute_stats(&self) -> Stats {
        let mut temps = self.readings.iter().map(|r| r.temperature);
        let min = temps.clone().min();
        let max = temps.clone().max();
        let mean = temps
            .try_fold(Decimal::ZERO, Decimal::checked_add)
            .and_then(|sum| sum.checked_div(Decimal::from(self.readings.len())))
            .map(|mean| mean.round_dp(2));

        Stats {
            count: self.readings.len(),
            min,
            max,
            mean: if self.readings.is_empty() { None } else { mean },
        }
    }

    /// Readings strictly outside `[safe_min, safe_max]`.
    pub fn check_safety(&self) -> Vec<&Reading> {
        self.readings
            .iter()
            .filter(|r| matches!(self.classify(r), Safety::Below | Safety::Above))
            .collect()
    }

    /// Readings at or below `safe_min`, boundary included.
    pub fn cold_readings(&self) -> Vec<&Reading> {
        self.readings
            .iter()
            .filter(|r| r.temperature <= self.safe_min)
            .collect()
    }

    /// Readings at or above `safe_max`, boundary included.
    pub fn hot_readings(&self) -> Vec<&Reading> {
        self.readings
            .iter()
            .filter(|r| r.temperature >= self.safe_max)
            .collect()
    }

    /// Classify one reading against the safe band.
    pub fn classify(&self, reading: &Reading) -> Safety {
        let t = reading.temperature;
        if t < self.safe_min {
            Safety::Below
        } else if t > self.safe_max {
            Safety::Above
        } else if t == self.safe_min || t == self.safe_max {
            Safety::Boundary
        } else {
            Safety::Ok
        }
    }

    /// Human-readable report with statistics and alerts.
    pub fn report(&self) -> String {
        let stats = self.compute_stats();
        let mut lines = vec![
            "=== Temperature Monitor Report ===".to_owned(),
            format!("Count: {}", stats.count),
        ];
        if let (Some(min), Some(max), Some(mean)) = (stats.min, stats.max, stats.mean) {
            lines.push(format!("Min: {min:.2} °C"));
            lines.push(format!("Max: {max:.2} °C"));
            lines.push(format!("Mean: {mean:.2} °C"));
        }

        let outliers = self.check_safety();
        if outliers.is_empty() {
            lines.push(format!(
                "All readings within safe range ({:.1} °C - {:.1} °C).",
                self.safe_min, self.safe_max
            ));
        } else {
            lines.push(format!("{} reading(s) OUT OF SAFE RANGE:", outliers.len()));
            lines.extend(
                outliers
                    .iter()
                    .map(|r| format!("  - {:.2} °C at {}", r.temperature, r.timestamp)),
            );
        }
        join_lines(&lines)
    }

    /// Min, max and mean on three lines, `-` when there is nothing to
    /// summarise.
    pub fn analysis(&self) -> String {
        let stats = self.compute_stats();
        let show = |value: Option<Decimal>| value.map_or_else(|| "-".to_owned(), |v| format!("{v:.2}"));
        join_lines(&[
            format!("Min: {}", show(stats.min)),
            format!("Max: {}", show(stats.max)),
            format!("Mean: {}", show(stats.mean)),
        ])
    }

    /// Numbered listing of [`cold_readings`](Self::cold_readings).
    pub fn cold_report(&self) -> String {
        violation_listing(
            &format!("Cold readings <= {:.1} °C", self.safe_min),
            &self.cold_readings(),
        )
    }

    /// Numbered listing of [`hot_readings`](Self::hot_readings).
    pub fn hot_report(&self) -> String {
        violation_listing(
            &format!("Hot readings >= {:.1} °C", self.safe_max),
            &self.hot_readings(),
        )
    }
}

/// Entries shown by [`history_sample`] before the remainder is summarised.
pub const HISTORY_SAMPLE_SIZE: usize = 20;

/// The first `limit` readings, numbered from 1, followed by a count of
/// the entries left out.
pub fn history_sample(readings: &[Reading], limit: usize) -> String {
    let mut lines = vec![format!(
        "Loaded {} readings from /history (showing up to {limit})",
        readings.len()
    )];
    lines.extend(
        readings
            .iter()
            .take(limit)
            .zip(1_usize..)
            .map(|(r, n)| format!("{n:3}. {:.2} °C at {}", r.temperature, r.timestamp)),
    );
    let hidden = readings.len().saturating_sub(limit);
    if hidden > 0 {
        lines.push(format!("... ({hidden} more entries)"));
    }
    join_lines(&lines)
}

fn violation_listing(title: &str, readings: &[&Reading]) -> String {
    let mut lines = vec![format!("--- {title} ({}) ---", readings.len())];
    if readings.is_empty() {
        lines.push("None".to_owned());
    } else {
        lines.extend(
            readings
                .iter()
                .zip(1_usize..)
                .map(|(r, n)| format!("{n:3}. {:.2} °C at {}", r.temperature, r.timestamp)),
        );
    }
    join_lines(&lines)
}

fn join_lines(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

impl Default for TemperatureMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_SAFE_MIN, DEFAULT_SAFE_MAX)
    }
}
