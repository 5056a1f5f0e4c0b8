//! Monitor configuration.
//!
//! All configuration is loaded from environment variables; every
//! variable is optional.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `MONITOR_BASE_URL` | `http://localhost:3000` |
//! | `MONITOR_SAFE_MIN` | `20` |
//! | `MONITOR_SAFE_MAX` | `80` |
//! | `MONITOR_STREAM_EVENTS` | `10` |
//! | `MONITOR_STREAM_TIMEOUT_SECS` | unset (no timeout) |
//! | `MONITOR_MODE` | `report` |

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::error::MonitorError;
use crate::stats::{DEFAULT_SAFE_MAX, DEFAULT_SAFE_MIN};

/// What the monitor binary does once configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MonitorMode {
    /// History report, a bounded live stream, then a final report.
    #[default]
    Report,
    /// Numbered sample of the stored history.
    History,
    /// Min, max and mean of the stored history only.
    Analyze,
    /// Stored readings at or below `safe_min`.
    Cold,
    /// Stored readings at or above `safe_max`.
    Hot,
    /// Stream until interrupted, reconnecting as needed.
    Follow,
}

impl FromStr for MonitorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "report" => Ok(Self::Report),
            "history" => Ok(Self::History),
            "analyze" => Ok(Self::Analyze),
            "cold" => Ok(Self::Cold),
            "hot" => Ok(Self::Hot),
            "follow" => Ok(Self::Follow),
            other => Err(format!(
                "unknown mode {other:?} (expected report, history, analyze, cold, hot or follow)"
            )),
        }
    }
}

/// Complete monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Server base URL (e.g. `http://localhost:3000`).
    pub base_url: String,
    /// Lower edge of the safe band.
    pub safe_min: Decimal,
    /// Upper edge of the safe band.
    pub safe_max: Decimal,
    /// Live events to consume before the final report.
    pub stream_events: usize,
    /// Upper bound on time spent streaming.
    pub stream_timeout: Option<Duration>,
    /// Selected behaviour.
    pub mode: MonitorMode,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_owned(),
            safe_min: DEFAULT_SAFE_MIN,
            safe_max: DEFAULT_SAFE_MAX,
            stream_events: 10,
            stream_timeout: None,
            mode: MonitorMode::Report,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Config`] if a variable is set but does not
    /// parse, or the safe band is inverted.
    pub fn from_env() -> Result<Self, MonitorError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration using `lookup` in place of the environment.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Config`] if a value does not parse, or the
    /// safe band is inverted.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MonitorError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup("MONITOR_BASE_URL") {
            config.base_url = url;
        }
        if let Some(raw) = lookup("MONITOR_SAFE_MIN") {
            config.safe_min = parse_var("MONITOR_SAFE_MIN", &raw)?;
        }
        if let Some(raw) = lookup("MONITOR_SAFE_MAX") {
            config.safe_max = parse_var("MONITOR_SAFE_MAX", &raw)?;
        }
        if let Some(raw) = lookup("MONITOR_STREAM_EVENTS") {
            config.stream_events = parse_var("MONITOR_STREAM_EVENTS", &raw)?;
        }
        if let Some(raw) = lookup("MONITOR_STREAM_TIMEOUT_SECS") {
            let secs: u64 = parse_var("MONITOR_STREAM_TIMEOUT_SECS", &raw)?;
            config.stream_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(raw) = lookup("MONITOR_MODE") {
            config.mode = parse_var("MONITOR_MODE", &raw)?;
        }

        if config.safe_min > config.safe_max {
            return Err(MonitorError::Config {
                reason: format!(
                    "MONITOR_SAFE_MIN ({}) exceeds MONITOR_SAFE_MAX ({})",
                    config.safe_min, config.safe_max
                ),
            });
        }
        Ok(config)
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T, MonitorError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| MonitorError::Config {
        reason: format!("{name} = {raw:?}: {e}"),
    })
}
