//! # ORE Truck Controller Library
//!
//! On-vehicle control core for a single autonomous mining truck. A set of
//! periodic cooperating tasks shares a mutex-guarded state record and a
//! small synchronization substrate: a filtered-sample ring, an enum-keyed
//! event hub, and a bounded drop-oldest command queue.
//!
//! Data flows simulator → sensor filtering → (command logic, route
//! planner) → navigation control → simulated dynamics, with the fault
//! monitor and data collector observing the shared state and the MQTT
//! adapter bridging commands in and snapshots out.
//!
//! Every task is a struct whose `tick()` body is separated from its thread
//! loop, so the whole control chain can be driven deterministically under
//! test without threads or sleeps.

pub mod control;
pub mod events;
pub mod mqtt;
pub mod queue;
pub mod ring;
pub mod runtime;
pub mod store;
pub mod tasks;

use thiserror::Error;

/// Top-level controller error.
#[derive(Debug, Error)]
pub enum TruckError {
    /// Configuration loading or validation failed.
    #[error(transparent)]
    Config(#[from] ore_common::config::ConfigError),

    /// Filesystem error outside the config path.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A task thread could not be spawned.
    #[error("failed to spawn task '{0}': {1}")]
    Spawn(&'static str, String),
}

/// Current Unix time as fractional seconds.
pub(crate) fn unix_now() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
