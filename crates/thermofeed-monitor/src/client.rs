//! HTTP client for the thermofeed API.
//!
//! Wraps `reqwest` for the two endpoints a monitor needs: a one-shot
//! `GET /history` and a long-lived `GET /stream` whose server-sent
//! events are decoded incrementally by [`SseDecoder`].

use std::time::Duration;

use futures::StreamExt as _;
use reqwest::header::ACCEPT;
use thermofeed_core::Reading;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::MonitorError;
use crate::sse::SseDecoder;

/// Connect timeout applied to every request.
pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(3_050);

/// Total timeout for `GET /history`.
pub const HISTORY_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between reconnect attempts in [`ApiClient::stream_forever`].
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Client bound to one thermofeed server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Http`] if the underlying client cannot be
    /// constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self, MonitorError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { client, base_url })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Fetch the stored history, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Http`] on a transport error, a non-2xx
    /// status, or a body that is not a list of readings.
    pub async fn fetch_history(&self) -> Result<Vec<Reading>, MonitorError> {
        let readings = self
            .client
            .get(self.url("/history"))
            .timeout(HISTORY_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Reading>>()
            .await?;
        debug!(count = readings.len(), "history fetched");
        Ok(readings)
    }

    /// Consume `GET /stream`, calling `on_event` for every reading.
    ///
    /// Returns after `stop_after` readings, after `timeout` elapses, or
    /// when the server closes the stream, whichever comes first. The
    /// return value is the number of readings delivered. Frames that do
    /// not decode as a reading are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Http`] if the connection fails or the
    /// server answers with a non-2xx status.
    pub async fn stream<F>(
        &self,
        mut on_event: F,
        stop_after: Option<usize>,
        timeout: Option<Duration>,
    ) -> Result<usize, MonitorError>
    where
        F: FnMut(Reading),
    {
        if stop_after == Some(0) {
            return Ok(0);
        }

        let mut received = 0_usize;
        let consume = self.consume(&mut on_event, stop_after, &mut received);
        match timeout {
            Some(limit) => {
                if let Ok(result) = tokio::time::timeout(limit, consume).await {
                    result?;
                } else {
                    debug!(?limit, "stream timeout reached");
                }
            }
            None => consume.await?,
        }
        Ok(received)
    }

    async fn consume<F>(
        &self,
        on_event: &mut F,
        stop_after: Option<usize>,
        received: &mut usize,
    ) -> Result<(), MonitorError>
    where
        F: FnMut(Reading),
    {
        let response = self
            .client
            .get(self.url("/stream"))
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?
            .error_for_status()?;
        info!(url = %response.url(), "stream connected");

        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for payload in decoder.push(&chunk) {
                match serde_json::from_str::<Reading>(&payload) {
                    Ok(reading) => {
                        on_event(reading);
                        *received = received.saturating_add(1);
                        if stop_after.is_some_and(|limit| *received >= limit) {
                            return Ok(());
                        }
                    }
                    Err(e) => warn!(error = %e, payload = %payload, "skipping undecodable frame"),
                }
            }
        }
        debug!("stream closed by server");
        Ok(())
    }

    /// Stream until `stop` becomes `true`, reconnecting after errors or
    /// server-side closes with a [`RECONNECT_BACKOFF`] pause.
    ///
    /// Returns the total number of readings delivered.
    pub async fn stream_forever<F>(&self, mut on_event: F, mut stop: watch::Receiver<bool>) -> usize
    where
        F: FnMut(Reading),
    {
        let mut total = 0_usize;
        loop {
            let mut received = 0_usize;
            let stopped = tokio::select! {
                _ = stop.wait_for(|stopped| *stopped) => true,
                result = self.consume(&mut on_event, None, &mut received) => {
                    if let Err(e) = result {
                        warn!(error = %e, "stream failed, reconnecting");
                    } else {
                        info!("stream ended, reconnecting");
                    }
                    false
                }
            };
            total = total.saturating_add(received);
            if stopped {
                info!(total, "stream stopped");
                return total;
            }

            tokio::select! {
                _ = stop.wait_for(|stopped| *stopped) => {
                    info!(total, "stream stopped");
                    return total;
                }
                () = tokio::time::sleep(RECONNECT_BACKOFF) => {}
            }
        }
    }
}
