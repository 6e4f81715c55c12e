use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use signal_bot::config;
use signal_bot::constants::{CONFIG_DIR_ENV, DEFAULT_CONFIG_DIR};
use signal_bot::core::data_service::{KucoinDataService, MarketDataSource};
use signal_bot::core::signal_engine::SignalEngine;
use signal_bot::logging;
use signal_bot::types::Signal;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignore if missing).
    let _ = dotenvy::dotenv();

    let config_dir = std::env::var(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR));

    let config = config::load_config(&config_dir)?;

    // Hold the guard for the process lifetime.
    let _guard = logging::init_tracing(&config.app.logging)?;

    info!(
        config_dir = %config_dir.display(),
        base_url = %config.app.data_source.base_url,
        refresh_s = config.app.run.refresh_interval_seconds,
        "signal bot starting"
    );

    // -----------------------------------------------------------------------
    // Component construction
    // -----------------------------------------------------------------------

    let source: Arc<dyn MarketDataSource> = Arc::new(
        KucoinDataService::new(&config.app.data_source)
            .context("failed to build market data client")?,
    );
    let engine = SignalEngine::from_config(source, &config.strategies);
    let symbols: Vec<&str> = engine.symbols().collect();
    if symbols.is_empty() {
        anyhow::bail!("no strategies enabled in strategies.json");
    }
    info!(?symbols, "strategies registered");

    let (signal_tx, signal_rx) = mpsc::channel::<Signal>(16);
    let writer_handle = tokio::spawn(write_signals(signal_rx));

    // -----------------------------------------------------------------------
    // Single pass or periodic loop
    // -----------------------------------------------------------------------

    let interval_s = config.app.run.refresh_interval_seconds;
    if interval_s == 0 {
        let sent = engine.publish_all(None, &signal_tx).await;
        info!(sent, "single pass complete");
        drop(signal_tx);
    } else {
        let shutdown = CancellationToken::new();
        let ctrl_c_token = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("shutdown signal received, stopping gracefully..."),
                Err(e) => error!(error = %e, "failed to listen for Ctrl+C"),
            }
            ctrl_c_token.cancel();
        });

        info!("running; press Ctrl+C to stop");
        engine
            .run(Duration::from_secs(interval_s), None, signal_tx, shutdown)
            .await;
    }

    if let Err(e) = writer_handle.await {
        error!(error = %e, "signal writer task panicked");
    }

    info!("shutdown complete");
    Ok(())
}

/// Write each signal as one JSON line on stdout until the channel closes.
async fn write_signals(mut rx: mpsc::Receiver<Signal>) {
    while let Some(signal) = rx.recv().await {
        let line = match serde_json::to_string(&signal) {
            Ok(line) => line,
            Err(e) => {
                error!(symbol = %signal.symbol, error = %e, "failed to serialize signal");
                continue;
            }
        };
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{line}").and_then(|()| stdout.flush()) {
            error!(error = %e, "failed to write signal to stdout");
            break;
        }
    }
}
