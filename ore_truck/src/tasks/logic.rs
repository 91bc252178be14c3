//! Command logic task (10 Hz).
//!
//! Drains the remote-command queue each tick and applies the operating
//! state machine. Illegal transitions are ignored and recorded in
//! `last_event`. Mode changes signal the navigation task so it can
//! re-initialize its loops bumplessly. In EMERGENCY, setpoints and route
//! are preserved; only an explicit RESET (which also clears latched
//! faults) leaves that state.

use std::sync::Arc;

use ore_common::command::Command;
use ore_common::state::{
    Faults, StatusChange, StatusEvent, TruckMode, TruckStatus, apply_status_event,
};
use tracing::{info, warn};

use crate::events::{EventHub, TruckEvent};
use crate::queue::CommandQueue;
use crate::store::{StateStore, VehicleState};

pub struct LogicTask {
    store: Arc<StateStore>,
    commands: Arc<CommandQueue>,
    events: Arc<EventHub>,
    /// Critical temperature, used to name the emergency cause.
    temp_crit: f64,
}

impl LogicTask {
    pub fn new(
        store: Arc<StateStore>,
        commands: Arc<CommandQueue>,
        events: Arc<EventHub>,
        temp_crit: f64,
    ) -> Self {
        Self {
            store,
            commands,
            events,
            temp_crit,
        }
    }

    pub fn tick(&mut self) {
        for command in self.commands.drain() {
            self.apply(command);
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::SetStatus(requested) => {
                self.apply_status(StatusEvent::Request(requested));
            }
            Command::Stop => {
                self.apply_status(StatusEvent::Request(TruckStatus::Stopped));
            }
            Command::Emergency => {
                self.apply_status(StatusEvent::Emergency);
            }
            Command::Reset => {
                self.apply_reset();
            }
            Command::SetMode(mode) => {
                self.apply_mode(mode);
            }
            Command::SetSetpointVelocity(value) => {
                if value.is_finite() {
                    self.store.update(|s| s.setpoint_velocity = value);
                } else {
                    warn!("ignored non-finite velocity setpoint");
                }
            }
            Command::SetSetpointAngular(value) => {
                if value.is_finite() {
                    self.store.update(|s| s.setpoint_angular = value);
                } else {
                    warn!("ignored non-finite angular setpoint");
                }
            }
            Command::SetRoute(waypoints) => {
                let count = waypoints.len();
                self.store.update(|s| {
                    s.route = waypoints;
                    s.current_waypoint_index = 0;
                    s.last_event = format!("route accepted ({count} waypoints)");
                });
                info!(waypoints = count, "route replaced");
            }
        }
    }

    fn apply_status(&mut self, event: StatusEvent) {
        let temp_crit = self.temp_crit;
        let applied = self.store.update(|s| {
            match apply_status_event(s.status, event) {
                StatusChange::To(next) => {
                    let prev = s.status;
                    s.status = next;
                    s.last_event = if next == TruckStatus::Emergency {
                        emergency_reason(s, temp_crit)
                    } else {
                        format!("status {prev} -> {next}")
                    };
                    Some((prev, next, s.last_event.clone()))
                }
                StatusChange::Unchanged => None,
                StatusChange::Rejected(reason) => {
                    s.last_event = format!("ignored command: {reason}");
                    None
                }
            }
        });

        if let Some((prev, next, event_text)) = applied {
            info!(%prev, %next, "{event_text}");
        }
    }

    fn apply_reset(&mut self) {
        let applied = self.store.update(|s| {
            match apply_status_event(s.status, StatusEvent::Reset) {
                StatusChange::To(next) => {
                    s.status = next;
                    s.faults = Faults::default();
                    s.last_event = "reset: faults cleared".to_string();
                    true
                }
                StatusChange::Unchanged => false,
                StatusChange::Rejected(reason) => {
                    s.last_event = format!("ignored command: {reason}");
                    false
                }
            }
        });

        if applied {
            info!("reset applied, returning to STOPPED");
        }
    }

    fn apply_mode(&mut self, mode: TruckMode) {
        let changed = self.store.update(|s| {
            if s.mode == mode {
                false
            } else {
                let prev = s.mode;
                s.mode = mode;
                s.last_event = format!("mode {prev} -> {mode}");
                true
            }
        });

        if changed {
            // Wake navigation so the handover is bumpless.
            self.events.signal(TruckEvent::ModeChange);
            info!(%mode, "control mode changed");
        }
    }
}

/// Name the cause of an EMERGENCY from the state observed when it latched.
fn emergency_reason(s: &VehicleState, temp_crit: f64) -> String {
    if s.temperature >= temp_crit {
        format!("emergency: critical temperature {:.1} C", s.temperature)
    } else if s.faults.electrical {
        "emergency: electrical fault".to_string()
    } else if s.faults.hydraulic {
        "emergency: hydraulic fault".to_string()
    } else {
        "emergency stop commanded".to_string()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
