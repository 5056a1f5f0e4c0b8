//! Error types for the monitoring client.

/// Errors that can occur while talking to a thermofeed server.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The HTTP request failed or returned an error status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A configuration value could not be used.
    #[error("configuration error: {reason}")]
    Config {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}
