//! Remote command sum type.
//!
//! Commands arrive as JSON `{"type": "...", "value": ...}` objects on the
//! per-truck command topic and are represented as a tagged variant —
//! unknown `type` strings fail deserialization and are dropped with a
//! logged warning at the adapter boundary. Routes arrive on their own
//! topic as `{"waypoints": [[x, y], ...]}`.

use serde::{Deserialize, Serialize};

use crate::state::{TruckMode, TruckStatus, Waypoint};

/// A remote or locally injected command for the logic task.
///
/// Delivery is at-most-once and unordered; every variant except the
/// setpoint changes is idempotent, and setpoints are last-writer-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Switch the setpoint source.
    SetMode(TruckMode),
    /// Request an operating status (STOPPED or RUNNING).
    SetStatus(TruckStatus),
    /// Latch EMERGENCY: zero actuation until RESET.
    Emergency,
    /// Leave EMERGENCY, clearing latched faults.
    Reset,
    /// Manual linear velocity reference [m/s].
    SetSetpointVelocity(f64),
    /// Manual angular velocity reference [rad/s].
    SetSetpointAngular(f64),
    /// Replace the active route (waypoint index restarts at 0).
    SetRoute(Vec<Waypoint>),
    /// Shorthand for SET_STATUS(STOPPED).
    Stop,
}

/// Payload of the per-truck route topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub waypoints: Vec<Waypoint>,
}

// ─── Tests ──────────────────────────────────────────────────────────
