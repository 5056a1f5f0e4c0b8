//! thermofeed monitor binary.
//!
//! Behaviour is picked with `MONITOR_MODE`:
//!
//! | Mode | Output |
//! |------|--------|
//! | `report` | History report, `MONITOR_STREAM_EVENTS` live readings, final report |
//! | `history` | First 20 stored readings and a count of the rest |
//! | `analyze` | Min, max and mean of the stored history |
//! | `cold` / `hot` | Stored readings at or beyond the safe band edges |
//! | `follow` | Live readings until `Ctrl-C`, then a report |

use anyhow::Context as _;
use thermofeed_core::Reading;
use thermofeed_monitor::{
    ApiClient, HISTORY_SAMPLE_SIZE, MonitorConfig, MonitorMode, Safety, TemperatureMonitor,
    history_sample,
};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = MonitorConfig::from_env().context("loading monitor configuration")?;
    info!(
        base_url = config.base_url,
        safe_min = %config.safe_min,
        safe_max = %config.safe_max,
        mode = ?config.mode,
        "thermofeed monitor starting"
    );

    let client = ApiClient::new(&config.base_url)?;
    let mut monitor = TemperatureMonitor::new(config.safe_min, config.safe_max);

    match config.mode {
        MonitorMode::Report => report(&client, &config, &mut monitor).await?,
        MonitorMode::History => {
            let history = fetch_history(&client).await?;
            print!("{}", history_sample(&history, HISTORY_SAMPLE_SIZE));
        }
        MonitorMode::Analyze => {
            // A failed fetch still prints the placeholder summary.
            match client.fetch_history().await {
                Ok(history) => monitor.add_readings(history),
                Err(e) => warn!(error = %e, "could not fetch history"),
            }
            print!("{}", monitor.analysis());
        }
        MonitorMode::Cold => {
            monitor.add_readings(fetch_history(&client).await?);
            print!("{}", monitor.cold_report());
        }
        MonitorMode::Hot => {
            monitor.add_readings(fetch_history(&client).await?);
            print!("{}", monitor.hot_report());
        }
        MonitorMode::Follow => follow(&client, &mut monitor).await,
    }
    Ok(())
}

async fn fetch_history(client: &ApiClient) -> anyhow::Result<Vec<Reading>> {
    let history = client
        .fetch_history()
        .await
        .with_context(|| format!("fetching history from {}", client.base_url()))?;
    info!(count = history.len(), "history loaded");
    Ok(history)
}

async fn report(
    client: &ApiClient,
    config: &MonitorConfig,
    monitor: &mut TemperatureMonitor,
) -> anyhow::Result<()> {
    monitor.add_readings(fetch_history(client).await?);
    print!("{}", monitor.report());

    let received = client
        .stream(
            |reading| log_and_keep(monitor, reading),
            Some(config.stream_events),
            config.stream_timeout,
        )
        .await
        .context("following live stream")?;
    info!(received, "live stream finished");

    print!("{}", monitor.report());
    Ok(())
}

async fn follow(client: &ApiClient, monitor: &mut TemperatureMonitor) {
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            return;
        }
        stop_tx.send_replace(true);
    });

    info!("streaming until Ctrl-C");
    let received = client
        .stream_forever(|reading| log_and_keep(monitor, reading), stop_rx)
        .await;
    info!(received, accumulated = monitor.readings().len(), "streaming stopped");
    print!("{}", monitor.report());
}

/// Log one live reading with its classification and keep it.
fn log_and_keep(monitor: &mut TemperatureMonitor, reading: Reading) {
    let safety = monitor.classify(&reading);
    if matches!(safety, Safety::Below | Safety::Above) {
        warn!(
            temperature = %reading.temperature,
            timestamp = reading.timestamp,
            "{}",
            safety.label()
        );
    } else {
        info!(
            temperature = %reading.temperature,
            timestamp = reading.timestamp,
            "{}",
            safety.label()
        );
    }
    monitor.add_reading(reading);
}
