//! Mine simulator task (20 Hz).
//!
//! Integrates the vehicle dynamics under the latest actuation command and
//! publishes a noisy raw sample for the sensor task. This closes the
//! control loop in place of real hardware.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::control::dynamics::{Actuation, RawSample, TruckDynamics};
use crate::unix_now;

pub struct SimulatorTask {
    dynamics: TruckDynamics,
    actuation: Arc<Mutex<Actuation>>,
    raw_feed: Arc<Mutex<Option<RawSample>>>,
    /// Integration step [s], fixed to the task period.
    dt: f64,
}

impl SimulatorTask {
    pub fn new(
        dynamics: TruckDynamics,
        actuation: Arc<Mutex<Actuation>>,
        raw_feed: Arc<Mutex<Option<RawSample>>>,
        dt: f64,
    ) -> Self {
        Self {
            dynamics,
            actuation,
            raw_feed,
            dt,
        }
    }

    pub fn tick(&mut self) {
        let command = *self.actuation.lock();
        self.dynamics.step(&command, self.dt);
        let sample = self.dynamics.observe(unix_now());
        *self.raw_feed.lock() = Some(sample);
    }

    /// Direct access to the model (test setup and fault injection).
    pub fn dynamics_mut(&mut self) -> &mut TruckDynamics {
        &mut self.dynamics
    }

    pub fn dynamics(&self) -> &TruckDynamics {
        &self.dynamics
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ore_common::config::DynamicsSettings;

    fn task() -> SimulatorTask {
        let settings = DynamicsSettings {
            noise_seed: Some(1),
            ..DynamicsSettings::default()
        };
        SimulatorTask::new(
            TruckDynamics::new(settings, false),
            Arc::new(Mutex::new(Actuation::default())),
            Arc::new(Mutex::new(None)),
            0.05,
        )
    }

    #[test]
    fn publishes_raw_samples() {
        let mut sim = task();
        assert!(sim.raw_feed.lock().is_none());
        sim.tick();
        let sample = sim.raw_feed.lock().unwrap();
        assert!(sample.timestamp > 0.0);
    }

    #[test]
    fn follows_actuation_command() {
        let mut sim = task();
        *sim.actuation.lock() = Actuation {
            velocity: 4.0,
            angular: 0.0,
        };
        for _ in 0..100 {
            sim.tick();
        }
        assert!((sim.dynamics().velocity() - 4.0).abs() < 0.05);
    }
}
