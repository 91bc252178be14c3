//! Navigation controller task (20 Hz).
//!
//! Dual PID: linear velocity against `setpoint_velocity`, angular velocity
//! against `setpoint_angular` (the angular measurement is derived from the
//! filtered heading difference per tick). Whenever `status != RUNNING` the
//! drivetrain command is forced to (0, 0); in EMERGENCY the integral
//! accumulators are additionally held. A mode-change signal triggers a
//! bumpless re-initialization of both loops from the last issued commands.

use std::sync::Arc;

use ore_common::config::TruckConfig;
use ore_common::state::TruckStatus;
use parking_lot::Mutex;

use crate::control::dynamics::Actuation;
use crate::control::pid::Pid;
use crate::control::wrap_angle;
use crate::events::{EventHub, TruckEvent};
use crate::store::StateStore;

pub struct NavigationTask {
    store: Arc<StateStore>,
    actuation: Arc<Mutex<Actuation>>,
    events: Arc<EventHub>,
    pid_velocity: Pid,
    pid_angular: Pid,
    /// Control step [s], fixed to the task period.
    dt: f64,
    prev_theta: Option<f64>,
    mode_seen: u64,
}

impl NavigationTask {
    pub fn new(
        store: Arc<StateStore>,
        actuation: Arc<Mutex<Actuation>>,
        events: Arc<EventHub>,
        config: &TruckConfig,
    ) -> Self {
        let mode_seen = events.generation(TruckEvent::ModeChange);
        Self {
            store,
            actuation,
            pid_velocity: Pid::new(&config.pid_linear),
            pid_angular: Pid::new(&config.pid_angular),
            dt: config.periods.nav().as_secs_f64(),
            prev_theta: None,
            mode_seen,
            events,
        }
    }

    pub fn tick(&mut self) {
        let snap = self.store.snapshot();

        let measured_angular = match self.prev_theta {
            Some(prev) => wrap_angle(snap.pose.theta - prev) / self.dt,
            None => 0.0,
        };
        self.prev_theta = Some(snap.pose.theta);

        // Bumpless transfer: on a mode change, seed both loops so the
        // first output under the new source equals the last one issued.
        let mode_generation = self.events.generation(TruckEvent::ModeChange);
        if mode_generation != self.mode_seen {
            self.mode_seen = mode_generation;
            self.pid_velocity.reinit(
                snap.commanded_velocity,
                snap.setpoint_velocity,
                snap.velocity,
                self.dt,
            );
            self.pid_angular.reinit(
                snap.commanded_angular,
                snap.setpoint_angular,
                measured_angular,
                self.dt,
            );
        }

        let (v_cmd, w_cmd) = match snap.status {
            TruckStatus::Running => (
                self.pid_velocity.step(snap.setpoint_velocity, snap.velocity, self.dt),
                self.pid_angular.step(snap.setpoint_angular, measured_angular, self.dt),
            ),
            TruckStatus::Stopped => {
                // Keep loop state fresh against a zero reference.
                self.pid_velocity.step(0.0, snap.velocity, self.dt);
                self.pid_angular.step(0.0, measured_angular, self.dt);
                (0.0, 0.0)
            }
            TruckStatus::Emergency => {
                // Integrals held while actuation is latched to zero.
                self.pid_velocity.step_held(0.0, snap.velocity, self.dt);
                self.pid_angular.step_held(0.0, measured_angular, self.dt);
                (0.0, 0.0)
            }
        };

        *self.actuation.lock() = Actuation {
            velocity: v_cmd,
            angular: w_cmd,
        };
        self.store.update(|s| {
            s.commanded_velocity = v_cmd;
            s.commanded_angular = w_cmd;
            s.angular_velocity = measured_angular;
        });
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
