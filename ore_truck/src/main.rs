//! # ORE Truck Controller Binary
//!
//! On-vehicle control core for one autonomous mining truck.
//!
//! # Usage
//!
//! ```bash
//! # Run truck 3 with simulated dynamics, no network traffic
//! ore_truck --id 3
//!
//! # Same, with the messaging adapter against a local broker
//! ore_truck --id 3 --mqtt
//!
//! # Custom config and broker, verbose logging
//! ore_truck --id 3 --mqtt --config config/truck.toml --broker mine-ops -v
//! ```

use std::path::PathBuf;

use clap::Parser;
use ore_common::config::{ConfigError, TruckConfig};
use ore_truck::runtime::TruckRuntime;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// ORE truck controller - periodic control tasks for one mining truck
#[derive(Parser, Debug)]
#[command(name = "ore_truck")]
#[command(version)]
#[command(about = "On-vehicle real-time control core for an ORE mining truck")]
struct Args {
    /// Truck identifier (positive integer)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    id: u32,

    /// Enable the messaging adapter (publish/subscribe to the broker)
    #[arg(long)]
    mqtt: bool,

    /// Path to the controller configuration file
    #[arg(short, long, default_value = "config/truck.toml")]
    config: PathBuf,

    /// Override the broker host from the config file
    #[arg(long)]
    broker: Option<String>,

    /// Override the broker port from the config file
    #[arg(long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        error!("truck startup failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_tracing(&args);

    info!("ORE truck controller v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(&args.config)?;
    if let Some(host) = args.broker {
        config.broker.host = host;
    }
    if let Some(port) = args.port {
        config.broker.port = port;
    }

    let runtime = TruckRuntime::start(config, args.id, args.mqtt)?;

    // SIGINT/SIGTERM → clean stop.
    {
        let shutdown = std::sync::Arc::clone(&runtime.context().shutdown);
        let events = std::sync::Arc::clone(&runtime.context().events);
        ctrlc::set_handler(move || {
            info!("received shutdown signal");
            shutdown.store(true, std::sync::atomic::Ordering::Relaxed);
            events.broadcast(ore_truck::events::TruckEvent::Shutdown);
        })?;
    }

    runtime.wait_for_shutdown();
    runtime.stop();

    info!("ORE truck controller shutdown complete");
    Ok(())
}

/// Load the config file, falling back to defaults when it is absent.
fn load_config(path: &std::path::Path) -> Result<TruckConfig, ConfigError> {
    if !path.exists() {
        info!(path = %path.display(), "config file not found, using defaults");
        return Ok(TruckConfig::default());
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("failed to read {}: {e}", path.display())))?;
    let config = TruckConfig::from_toml(&text)?;
    info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Set up the tracing subscriber from the CLI flags.
fn setup_tracing(args: &Args) {
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
