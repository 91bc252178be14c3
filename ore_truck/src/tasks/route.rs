//! Route planner task (2 Hz).
//!
//! Active only in AUTOMATIC_REMOTE (and not while EMERGENCY is latched, so
//! the preserved setpoints stay untouched). Steers toward the current
//! waypoint with a proportional heading law and a cruise speed that falls
//! off as cos² of the heading error, reaching zero at ±π/2. Waypoints are
//! accepted inside the configured radius; after the last one both
//! setpoints drop to zero and a completion event is recorded once.

use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use ore_common::config::TruckConfig;
use ore_common::state::{TruckMode, TruckStatus};
use tracing::info;

use crate::control::wrap_angle;
use crate::store::StateStore;

pub struct RoutePlannerTask {
    store: Arc<StateStore>,
    accept_radius: f64,
    cruise_velocity: f64,
    heading_gain: f64,
    /// Angular setpoint clamp, from the angular loop saturation.
    max_angular_setpoint: f64,
}

enum PlanOutcome {
    Idle,
    Steering,
    WaypointReached(usize),
    RouteComplete,
}

impl RoutePlannerTask {
    pub fn new(store: Arc<StateStore>, config: &TruckConfig) -> Self {
        Self {
            store,
            accept_radius: config.route.waypoint_accept_radius,
            cruise_velocity: config.route.cruise_velocity,
            heading_gain: config.route.heading_gain,
            max_angular_setpoint: config.pid_angular.out_max,
        }
    }

    pub fn tick(&mut self) {
        let outcome = self.store.update(|s| {
            if s.mode != TruckMode::AutomaticRemote || s.status == TruckStatus::Emergency {
                return PlanOutcome::Idle;
            }
            if s.route.is_empty() || s.current_waypoint_index >= s.route.len() {
                return PlanOutcome::Idle;
            }

            let target = s.route[s.current_waypoint_index];
            let dx = target.x - s.pose.x;
            let dy = target.y - s.pose.y;
            let distance = (dx * dx + dy * dy).sqrt();

            if distance <= self.accept_radius {
                s.current_waypoint_index += 1;
                if s.current_waypoint_index >= s.route.len() {
                    s.setpoint_velocity = 0.0;
                    s.setpoint_angular = 0.0;
                    s.last_event = "route complete".to_string();
                    return PlanOutcome::RouteComplete;
                }
                let reached = s.current_waypoint_index;
                s.last_event = format!("waypoint {reached} reached");
                // Fall through and steer toward the next target right away.
                let target = s.route[s.current_waypoint_index];
                self.steer(s, target.x - s.pose.x, target.y - s.pose.y);
                return PlanOutcome::WaypointReached(reached);
            }

            self.steer(s, dx, dy);
            PlanOutcome::Steering
        });

        match outcome {
            PlanOutcome::RouteComplete => info!("route complete"),
            PlanOutcome::WaypointReached(n) => info!(waypoint = n, "waypoint reached"),
            PlanOutcome::Idle | PlanOutcome::Steering => {}
        }
    }

    fn steer(&self, s: &mut crate::store::VehicleState, dx: f64, dy: f64) {
        let desired_heading = dy.atan2(dx);
        let heading_error = wrap_angle(desired_heading - s.pose.theta);

        s.setpoint_angular = (self.heading_gain * heading_error)
            .clamp(-self.max_angular_setpoint, self.max_angular_setpoint);

        // Slow down while misaligned; no forward drive beyond ±π/2.
        s.setpoint_velocity = if heading_error.abs() >= FRAC_PI_2 {
            0.0
        } else {
            self.cruise_velocity * heading_error.cos().powi(2)
        };
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
