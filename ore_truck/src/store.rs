//! Shared vehicle state store.
//!
//! One mutex-guarded [`VehicleState`] per truck. Tasks either take a full
//! [`StateStore::snapshot`] or run a short closure under the lock via
//! [`StateStore::update`] — never I/O inside the critical section.
//!
//! Writer discipline: the logic task owns `status`/`mode`, the sensor task
//! owns the filtered `pose`/`velocity`/`temperature`, the navigation task
//! owns the commanded outputs and measured angular rate, the route planner
//! owns `setpoint_*` (in automatic mode) and the waypoint index, and the
//! fault monitor owns the fault flags.

use ore_common::state::{Faults, Pose, TruckMode, TruckStatus, Waypoint};
use parking_lot::Mutex;

/// Complete state record of one truck.
#[derive(Debug, Clone)]
pub struct VehicleState {
    /// Identifier assigned at startup.
    pub truck_id: u32,
    /// Filtered pose.
    pub pose: Pose,
    /// Filtered linear speed [m/s].
    pub velocity: f64,
    /// Measured angular rate [rad/s] (from filtered heading difference).
    pub angular_velocity: f64,
    /// Filtered engine temperature [°C].
    pub temperature: f64,
    pub status: TruckStatus,
    pub mode: TruckMode,
    /// Linear velocity reference [m/s].
    pub setpoint_velocity: f64,
    /// Angular velocity reference [rad/s].
    pub setpoint_angular: f64,
    pub faults: Faults,
    /// Active route; `current_waypoint_index == route.len()` means done.
    pub route: Vec<Waypoint>,
    pub current_waypoint_index: usize,
    /// Last notable event, human readable.
    pub last_event: String,
    /// Linear velocity command sent to the drivetrain [m/s].
    pub commanded_velocity: f64,
    /// Angular velocity command sent to the drivetrain [rad/s].
    pub commanded_angular: f64,
}

impl VehicleState {
    /// Fresh state for a truck: stopped, local manual, no route.
    pub fn new(truck_id: u32, initial_temperature: f64) -> Self {
        Self {
            truck_id,
            pose: Pose::default(),
            velocity: 0.0,
            angular_velocity: 0.0,
            temperature: initial_temperature,
            status: TruckStatus::Stopped,
            mode: TruckMode::ManualLocal,
            setpoint_velocity: 0.0,
            setpoint_angular: 0.0,
            faults: Faults::default(),
            route: Vec::new(),
            current_waypoint_index: 0,
            last_event: String::new(),
            commanded_velocity: 0.0,
            commanded_angular: 0.0,
        }
    }

    /// True when a route exists and every waypoint has been accepted.
    pub fn route_complete(&self) -> bool {
        !self.route.is_empty() && self.current_waypoint_index >= self.route.len()
    }
}

/// Mutex-guarded owner of the single [`VehicleState`].
pub struct StateStore {
    inner: Mutex<VehicleState>,
}

impl StateStore {
    pub fn new(truck_id: u32, initial_temperature: f64) -> Self {
        Self {
            inner: Mutex::new(VehicleState::new(truck_id, initial_temperature)),
        }
    }

    /// Clone the current state. Readers work on the copy, off the lock.
    pub fn snapshot(&self) -> VehicleState {
        self.inner.lock().clone()
    }

    /// Run a short mutation under the lock and return its result.
    pub fn update<R>(&self, f: impl FnOnce(&mut VehicleState) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Record a human-readable event in `last_event`.
    pub fn record_event(&self, event: impl Into<String>) {
        self.inner.lock().last_event = event.into();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
