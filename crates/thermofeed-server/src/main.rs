//! thermofeed service binary.
//!
//! Wires the history store, the shared tick loop and the HTTP API
//! together, then serves until `Ctrl-C` or `SIGTERM`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`thermofeed.yaml` + environment overrides)
//! 2. Initialize structured logging (tracing)
//! 3. Connect to the history store (fatal on failure)
//! 4. Build the registry, history window and broadcaster
//! 5. Spawn the tick loop
//! 6. Serve `/stream`, `/history` and `/health`
//! 7. On shutdown, stop the tick loop and close the store connection

mod error;

use std::sync::Arc;

use thermofeed_core::config::LoggingConfig;
use thermofeed_core::{
    Broadcaster, FeedConfig, HistoryLog, ReadingGenerator, StoreBackendKind, SubscriberRegistry,
};
use thermofeed_db::HistoryBackend;
use thermofeed_observer::{AppState, ServerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the store connection, or the
/// HTTP listener fails.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Load configuration.
    let config = FeedConfig::load()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!(
        port = config.server.port,
        store = ?config.store.backend,
        history_key = config.store.history_key,
        window = config.store.window,
        tick_interval_ms = config.stream.tick_interval_ms,
        "thermofeed starting"
    );

    // 3. Connect to the history store.
    let backend = match config.store.backend {
        StoreBackendKind::Dragonfly => {
            info!(url = config.store.url, "Connecting to Dragonfly");
            HistoryBackend::dragonfly(&config.store.url).await?
        }
        StoreBackendKind::Memory => {
            warn!("Using in-memory history store, history is lost on restart");
            HistoryBackend::memory()
        }
    };

    // 4. Build the tick loop.
    let history = HistoryLog::new(
        backend.clone(),
        config.store.history_key.clone(),
        config.store.window,
    );
    let registry = SubscriberRegistry::new(config.stream.subscriber_buffer);
    let broadcaster = Broadcaster::new(registry, history, ReadingGenerator::new())
        .with_interval(config.stream.tick_interval());
    let state = Arc::new(AppState::from_broadcaster(&broadcaster));

    // 5. Spawn the tick loop.
    let tick_handle = broadcaster.spawn();
    info!("Tick loop spawned, idle until the first subscriber");

    // 6. Serve until shutdown.
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let served = thermofeed_observer::start_server(&server_config, state, shutdown_signal()).await;

    // 7. Tear down.
    tick_handle.abort();
    if let HistoryBackend::Dragonfly(pool) = &backend {
        if let Err(e) = pool.quit().await {
            warn!(error = %e, "Dragonfly quit failed");
        }
    }
    served?;

    info!("thermofeed stopped");
    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_logging(logging: &LoggingConfig) -> Result<(), AppError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| AppError::Logging {
        message: e.to_string(),
    })
}

/// Resolve when the process receives `Ctrl-C` or `SIGTERM`.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
