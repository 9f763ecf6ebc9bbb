//! Heatlink daemon.
//!
//! Polls a Modbus TCP heating controller on a schedule and keeps an
//! atomically swapped snapshot of every configured signal. Presentation
//! layers consume the snapshot and submit writes through the command
//! gateway; this binary owns the schedule and the session.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Mutex;
use tracing::{debug, info};

use heatlink::config::HeatlinkConfig;
use heatlink::poller::Poller;
use heatlink::registers::RegisterMap;
use heatlink::session::DeviceSession;
use heatlink::snapshot::SignalStatus;
use heatlink::transport::TcpTransport;

/// Modbus polling daemon for a heating controller.
#[derive(Parser, Debug)]
#[command(name = "heatlink")]
#[command(about = "Polls a heating controller over Modbus TCP and caches its state")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format)
    #[arg(short, long, default_value = "heatlink.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = HeatlinkConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Initialize logging
    let log_config = heatlink::LoggingConfig {
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        format: config.logging.format,
    };
    heatlink::init_tracing(&log_config)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    info!("Starting heatlink");
    info!("Loaded configuration from {:?}", args.config);

    let map = Arc::new(
        RegisterMap::new(config.descriptors()).context("Invalid signal catalogue")?,
    );

    let addr: SocketAddr = format!("{}:{}", config.device.host, config.device.port)
        .parse()
        .with_context(|| format!("Invalid device address {}:{}", config.device.host, config.device.port))?;

    let transport = TcpTransport::new(
        addr,
        config.device.unit_id,
        Duration::from_millis(config.device.timeout_ms),
    );
    let session = Arc::new(Mutex::new(DeviceSession::new(transport)));

    let (poller, mut snapshots) = Poller::new(
        Arc::clone(&session),
        Arc::clone(&map),
        Duration::from_millis(config.device.poll_interval_ms),
    );

    info!(
        "Polling {} at unit {} every {}ms ({} signal(s))",
        addr,
        config.device.unit_id,
        config.device.poll_interval_ms,
        map.len()
    );

    let poll_task = tokio::spawn(async move {
        poller.run().await;
    });

    // Log a freshness summary as each snapshot lands.
    let observer = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            debug!(
                "Snapshot @ {}: {} ok, {} stale, {} read errors",
                snapshot.taken_at,
                snapshot.count_with_status(SignalStatus::Ok),
                snapshot.count_with_status(SignalStatus::Stale),
                snapshot.count_with_status(SignalStatus::ReadError),
            );
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    poll_task.abort();
    observer.abort();

    session.lock().await.close().await;
    info!("Heatlink stopped");

    Ok(())
}
