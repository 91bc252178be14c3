//! Controller configuration with serde defaults and validation.
//!
//! Every recognized option has a default matching the documented tuning,
//! so a missing file or empty table yields a runnable configuration. The
//! tree parses from TOML; [`TruckConfig::validate`] rejects values that
//! would break the control loops before any task starts.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading/validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("config I/O error: {0}")]
    Io(String),
    /// TOML parse error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Parameter validation error.
    #[error("config validation: {0}")]
    Validation(String),
}

// ─── Task Periods ───────────────────────────────────────────────────

/// Periods of the cooperating tasks, in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Periods {
    /// Mine simulator integration period.
    pub sim_ms: u64,
    /// Sensor sampling/filtering period.
    pub sensor_ms: u64,
    /// Command logic period.
    pub logic_ms: u64,
    /// Navigation controller period.
    pub nav_ms: u64,
    /// Route planner period.
    pub route_ms: u64,
    /// Fault monitor period.
    pub fault_ms: u64,
    /// Data collector period.
    pub log_ms: u64,
}

impl Default for Periods {
    fn default() -> Self {
        Self {
            sim_ms: 50,
            sensor_ms: 100,
            logic_ms: 100,
            nav_ms: 50,
            route_ms: 500,
            fault_ms: 500,
            log_ms: 1000,
        }
    }
}

impl Periods {
    /// Simulator period as a `Duration`.
    pub fn sim(&self) -> Duration {
        Duration::from_millis(self.sim_ms)
    }
    pub fn sensor(&self) -> Duration {
        Duration::from_millis(self.sensor_ms)
    }
    pub fn logic(&self) -> Duration {
        Duration::from_millis(self.logic_ms)
    }
    pub fn nav(&self) -> Duration {
        Duration::from_millis(self.nav_ms)
    }
    pub fn route(&self) -> Duration {
        Duration::from_millis(self.route_ms)
    }
    pub fn fault(&self) -> Duration {
        Duration::from_millis(self.fault_ms)
    }
    pub fn log(&self) -> Duration {
        Duration::from_millis(self.log_ms)
    }
}

// ─── PID Gains ──────────────────────────────────────────────────────

/// Gains and output saturation for one PID loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PidSettings {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
    /// Lower output saturation.
    pub out_min: f64,
    /// Upper output saturation.
    pub out_max: f64,
}

impl PidSettings {
    /// Linear velocity loop defaults: Kp=0.5, Ki=0.1, Kd=0.05, ±10 m/s.
    pub fn linear_default() -> Self {
        Self {
            kp: 0.5,
            ki: 0.1,
            kd: 0.05,
            out_min: -10.0,
            out_max: 10.0,
        }
    }

    /// Angular velocity loop defaults: Kp=1.0, Ki=0.05, Kd=0.2, ±1 rad/s.
    pub fn angular_default() -> Self {
        Self {
            kp: 1.0,
            ki: 0.05,
            kd: 0.2,
            out_min: -1.0,
            out_max: 1.0,
        }
    }
}

// ─── Vehicle Dynamics ───────────────────────────────────────────────

/// First-order-lag vehicle model and sensor noise parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsSettings {
    /// Velocity lag time constant [s].
    pub tau_s: f64,
    /// Physical linear speed limit [m/s].
    pub max_velocity: f64,
    /// Physical angular rate limit [rad/s].
    pub max_angular: f64,
    /// Position noise sigma [m].
    pub sigma_xy: f64,
    /// Heading noise sigma [rad].
    pub sigma_theta: f64,
    /// Speed noise sigma [m/s].
    pub sigma_velocity: f64,
    /// Temperature noise sigma [°C].
    pub sigma_temperature: f64,
    /// Engine temperature at standstill [°C].
    pub base_temperature: f64,
    /// Temperature rise per m/s of speed [°C·s/m].
    pub temp_rise_per_mps: f64,
    /// Thermal time constant [s].
    pub temp_tau_s: f64,
    /// Seed for the noise generator; omit for a random seed.
    pub noise_seed: Option<u64>,
}

impl Default for DynamicsSettings {
    fn default() -> Self {
        Self {
            tau_s: 0.5,
            max_velocity: 12.0,
            max_angular: 1.2,
            sigma_xy: 0.1,
            sigma_theta: 0.01,
            sigma_velocity: 0.05,
            sigma_temperature: 0.2,
            base_temperature: 80.0,
            temp_rise_per_mps: 2.0,
            temp_tau_s: 20.0,
            noise_seed: None,
        }
    }
}

// ─── Thermal & Fault Monitoring ─────────────────────────────────────

/// Fault monitor thresholds and stochastic fault injection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultSettings {
    /// Warning threshold [°C] — event only, no state change.
    pub temp_warn: f64,
    /// Critical threshold [°C] — forces EMERGENCY.
    pub temp_crit: f64,
    /// Per-tick Bernoulli probability of each stochastic fault.
    pub fault_probability: f64,
    /// Seed for the fault generator; omit for a random seed.
    pub fault_seed: Option<u64>,
}

impl Default for FaultSettings {
    fn default() -> Self {
        Self {
            temp_warn: 95.0,
            temp_crit: 120.0,
            fault_probability: 1e-3,
            fault_seed: None,
        }
    }
}

// ─── Route Planner ──────────────────────────────────────────────────

/// Waypoint-following parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSettings {
    /// Distance below which a waypoint counts as reached [m].
    pub waypoint_accept_radius: f64,
    /// Cruise speed request when aligned [m/s].
    pub cruise_velocity: f64,
    /// Proportional gain from heading error to angular setpoint.
    pub heading_gain: f64,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            waypoint_accept_radius: 2.0,
            cruise_velocity: 5.0,
            heading_gain: 1.0,
        }
    }
}

// ─── Telemetry & Broker ─────────────────────────────────────────────

/// CSV telemetry sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Directory receiving `truck_{id}.csv`.
    pub directory: PathBuf,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data"),
        }
    }
}

/// Messaging broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    /// MQTT keep-alive interval [s].
    pub keep_alive_s: u64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1883,
            keep_alive_s: 30,
        }
    }
}

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete truck controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TruckConfig {
    pub periods: Periods,
    /// Moving-average window for every sensor channel.
    pub filter_window: usize,
    /// Filtered-sample ring capacity.
    pub ring_capacity: usize,
    /// Bounded remote-command queue capacity.
    pub command_queue_capacity: usize,
    /// Allow negative (reverse) velocity commands to the drivetrain.
    pub allow_reverse: bool,
    pub pid_linear: PidSettings,
    pub pid_angular: PidSettings,
    pub dynamics: DynamicsSettings,
    pub fault: FaultSettings,
    pub route: RouteSettings,
    pub telemetry: TelemetrySettings,
    pub broker: BrokerSettings,
}

impl Default for TruckConfig {
    fn default() -> Self {
        Self {
            periods: Periods::default(),
            filter_window: 5,
            ring_capacity: 100,
            command_queue_capacity: 32,
            allow_reverse: false,
            pid_linear: PidSettings::linear_default(),
            pid_angular: PidSettings::angular_default(),
            dynamics: DynamicsSettings::default(),
            fault: FaultSettings::default(),
            route: RouteSettings::default(),
            telemetry: TelemetrySettings::default(),
            broker: BrokerSettings::default(),
        }
    }
}

impl TruckConfig {
    /// Parse a TOML string and validate it.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: TruckConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter bound; returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.periods;
        for (name, ms) in [
            ("periods.sim_ms", p.sim_ms),
            ("periods.sensor_ms", p.sensor_ms),
            ("periods.logic_ms", p.logic_ms),
            ("periods.nav_ms", p.nav_ms),
            ("periods.route_ms", p.route_ms),
            ("periods.fault_ms", p.fault_ms),
            ("periods.log_ms", p.log_ms),
        ] {
            if ms == 0 {
                return Err(ConfigError::Validation(format!("{name} must be > 0")));
            }
        }

        if self.filter_window == 0 {
            return Err(ConfigError::Validation(
                "filter_window must be >= 1".to_string(),
            ));
        }
        if self.ring_capacity < 5 {
            return Err(ConfigError::Validation(
                "ring_capacity must be >= 5".to_string(),
            ));
        }
        if self.command_queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "command_queue_capacity must be >= 1".to_string(),
            ));
        }

        for (name, pid) in [("pid_linear", &self.pid_linear), ("pid_angular", &self.pid_angular)] {
            if !(pid.out_min < pid.out_max) {
                return Err(ConfigError::Validation(format!(
                    "{name}: out_min {} must be below out_max {}",
                    pid.out_min, pid.out_max
                )));
            }
            for (g, v) in [("kp", pid.kp), ("ki", pid.ki), ("kd", pid.kd)] {
                if !v.is_finite() || v < 0.0 {
                    return Err(ConfigError::Validation(format!(
                        "{name}.{g} must be finite and >= 0"
                    )));
                }
            }
        }

        let d = &self.dynamics;
        if d.tau_s <= 0.0 || d.temp_tau_s <= 0.0 {
            return Err(ConfigError::Validation(
                "dynamics time constants must be > 0".to_string(),
            ));
        }
        if d.max_velocity <= 0.0 || d.max_angular <= 0.0 {
            return Err(ConfigError::Validation(
                "dynamics.max_velocity and max_angular must be > 0".to_string(),
            ));
        }
        for (name, sigma) in [
            ("sigma_xy", d.sigma_xy),
            ("sigma_theta", d.sigma_theta),
            ("sigma_velocity", d.sigma_velocity),
            ("sigma_temperature", d.sigma_temperature),
        ] {
            if !sigma.is_finite() || sigma < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "dynamics.{name} must be finite and >= 0"
                )));
            }
        }

        let f = &self.fault;
        if f.temp_warn >= f.temp_crit {
            return Err(ConfigError::Validation(format!(
                "fault.temp_warn {} must be below temp_crit {}",
                f.temp_warn, f.temp_crit
            )));
        }
        if !(0.0..=1.0).contains(&f.fault_probability) {
            return Err(ConfigError::Validation(
                "fault.fault_probability must be within [0, 1]".to_string(),
            ));
        }

        let r = &self.route;
        if r.waypoint_accept_radius <= 0.0 {
            return Err(ConfigError::Validation(
                "route.waypoint_accept_radius must be > 0".to_string(),
            ));
        }
        if r.cruise_velocity <= 0.0 {
            return Err(ConfigError::Validation(
                "route.cruise_velocity must be > 0".to_string(),
            ));
        }
        if r.heading_gain <= 0.0 {
            return Err(ConfigError::Validation(
                "route.heading_gain must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
