//! Verdant controller node
//!
//! Wires the resilient store, the telemetry producers, the relay
//! schedulers, and the health supervisor together and runs them as
//! tokio tasks until interrupted.

mod config;
mod control;
mod error;
mod health;
mod sim;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::Mutex;
use tokio::time;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use verdant_core::{Clock, SystemClock};
use verdant_storage::ResilientStore;
use verdant_telemetry::{EventLog, SensorCsvLogger};

use crate::config::NodeConfig;
use crate::control::{FanLogic, LightLogic, TracedRelay};
use crate::sim::SimulatedSensor;

#[derive(Parser)]
#[command(name = "verdant-node", about = "Greenhouse controller node", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "verdant.toml")]
    config: PathBuf,

    /// Log filter, e.g. "debug" or "verdant_storage=trace" (overrides RUST_LOG).
    #[arg(long)]
    log: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    let config = if cli.config.exists() {
        NodeConfig::load(&cli.config)
            .await
            .with_context(|| format!("loading {}", cli.config.display()))?
    } else {
        warn!(path = %cli.config.display(), "Config file not found, using defaults");
        NodeConfig::default()
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(Mutex::new(ResilientStore::new(config.storage.clone())));
    let events = Arc::new(Mutex::new(EventLog::new(
        clock.clone(),
        store.clone(),
        config.event_log.clone(),
    )));
    events.lock().await.info("Node", "System startup").await;

    let sensor = Arc::new(Mutex::new(SensorCsvLogger::new(
        clock.clone(),
        store.clone(),
        events.clone(),
        Box::new(SimulatedSensor::new()),
        config.sensor.clone(),
    )));

    let sample_interval = sensor.lock().await.interval();
    tokio::spawn(sensor_task(sensor.clone(), events.clone(), sample_interval));

    for fan in &config.fans {
        tokio::spawn(control::fan_task(
            fan.name.clone(),
            FanLogic::new(fan),
            Box::new(TracedRelay::new(&fan.name)),
            clock.clone(),
            sensor.clone(),
            events.clone(),
            Duration::from_secs(fan.poll_interval_secs),
        ));
    }

    tokio::spawn(control::light_task(
        LightLogic::new(&config.light),
        Box::new(TracedRelay::new("growlight")),
        clock.clone(),
        events.clone(),
        Duration::from_secs(config.light.poll_interval_secs),
    ));

    tokio::spawn(health::run(
        store.clone(),
        events.clone(),
        config.health.clone(),
    ));

    info!("All tasks spawned, node running");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    let mut events = events.lock().await;
    events.info("Node", "Shutdown requested").await;
    events.flush().await;
    Ok(())
}

/// Sampling loop: one climate reading per interval, with the event log
/// rotation check piggybacked on the same cadence.
async fn sensor_task(
    sensor: Arc<Mutex<SensorCsvLogger>>,
    events: Arc<Mutex<EventLog>>,
    interval: Duration,
) {
    loop {
        sensor.lock().await.log_once().await;
        events.lock().await.check_size().await;
        time::sleep(interval).await;
    }
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
