//! Core state enums for a single truck.
//!
//! All enums use `#[repr(u8)]` for compact layout and serialize with their
//! SCREAMING_SNAKE_CASE wire names. `TruckStatus` transitions go through
//! [`apply_status_event`], which enforces the operating state machine:
//! STOPPED ⇄ RUNNING by command, any state → EMERGENCY, and EMERGENCY
//! exits only via an explicit reset.

use serde::{Deserialize, Serialize};

// ─── Operating Status ───────────────────────────────────────────────

/// Global truck operating status.
///
/// EMERGENCY is sticky: actuation is forced to zero and the only exit is
/// an explicit RESET back to Stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum TruckStatus {
    /// Actuation disabled, awaiting a start command.
    Stopped = 0,
    /// Closed-loop control active.
    Running = 1,
    /// Fault or emergency command latched — zero actuation until reset.
    Emergency = 2,
}

impl TruckStatus {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Stopped),
            1 => Some(Self::Running),
            2 => Some(Self::Emergency),
            _ => None,
        }
    }

    /// Wire name of the status (also used in telemetry rows).
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "STOPPED",
            Self::Running => "RUNNING",
            Self::Emergency => "EMERGENCY",
        }
    }
}

impl Default for TruckStatus {
    fn default() -> Self {
        Self::Stopped
    }
}

impl std::fmt::Display for TruckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Control Mode ───────────────────────────────────────────────────

/// Control mode — who supplies the setpoints.
///
/// Mode changes are independent of [`TruckStatus`] and are always
/// accepted; the navigation controller re-initializes its loops on every
/// change so the handover is bumpless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum TruckMode {
    /// Setpoints from the local operator panel.
    ManualLocal = 0,
    /// Setpoints from the remote supervisor.
    ManualRemote = 1,
    /// Setpoints computed by the on-board route planner.
    AutomaticRemote = 2,
}

impl TruckMode {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::ManualLocal),
            1 => Some(Self::ManualRemote),
            2 => Some(Self::AutomaticRemote),
            _ => None,
        }
    }

    /// Wire name of the mode.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ManualLocal => "MANUAL_LOCAL",
            Self::ManualRemote => "MANUAL_REMOTE",
            Self::AutomaticRemote => "AUTOMATIC_REMOTE",
        }
    }
}

impl Default for TruckMode {
    fn default() -> Self {
        Self::ManualLocal
    }
}

impl std::fmt::Display for TruckMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Faults ─────────────────────────────────────────────────────────

/// Latched subsystem fault flags.
///
/// Once set, a flag persists until an explicit RESET clears it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faults {
    pub electrical: bool,
    pub hydraulic: bool,
}

impl Faults {
    /// Returns true if any fault flag is latched.
    #[inline]
    pub const fn any(&self) -> bool {
        self.electrical || self.hydraulic
    }
}

// ─── Geometry ───────────────────────────────────────────────────────

/// Planar pose: position in metres, heading in radians within (−π, π].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// East position [m].
    pub x: f64,
    /// North position [m].
    pub y: f64,
    /// Heading [rad], wrapped to (−π, π].
    pub theta: f64,
}

/// A route target on the mine map. Serialized as a `[x, y]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Waypoint {
    /// Target east position [m].
    pub x: f64,
    /// Target north position [m].
    pub y: f64,
}

impl Waypoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Waypoint {
    fn from(v: [f64; 2]) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

impl From<Waypoint> for [f64; 2] {
    fn from(w: Waypoint) -> Self {
        [w.x, w.y]
    }
}

// ─── Status Transitions ─────────────────────────────────────────────

/// Event that can drive a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// Operator/remote request for a specific status (SET_STATUS or STOP).
    Request(TruckStatus),
    /// Emergency command or detected fault.
    Emergency,
    /// Explicit reset out of EMERGENCY.
    Reset,
}

/// Outcome of a status transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Transition accepted — new status.
    To(TruckStatus),
    /// Request matched the current status (duplicate delivery) — no-op.
    Unchanged,
    /// Transition not allowed — reason.
    Rejected(&'static str),
}

/// Apply a status event against the current status.
///
/// Duplicate requests are tolerated as no-ops so at-most-once, unordered
/// command delivery stays idempotent. Anything else outside the table is
/// rejected with a reason the caller records in `last_event`.
pub fn apply_status_event(current: TruckStatus, event: StatusEvent) -> StatusChange {
    use StatusChange::{Rejected, To, Unchanged};

    match event {
        StatusEvent::Emergency => {
            if current == TruckStatus::Emergency {
                Unchanged
            } else {
                To(TruckStatus::Emergency)
            }
        }
        StatusEvent::Reset => match current {
            TruckStatus::Emergency => To(TruckStatus::Stopped),
            TruckStatus::Stopped => Unchanged,
            TruckStatus::Running => Rejected("reset only valid in EMERGENCY"),
        },
        StatusEvent::Request(requested) => {
            if requested == current {
                return Unchanged;
            }
            match (current, requested) {
                (TruckStatus::Emergency, _) => Rejected("EMERGENCY exits only via RESET"),
                // A SET_STATUS(EMERGENCY) behaves like the emergency command.
                (_, TruckStatus::Emergency) => To(TruckStatus::Emergency),
                (TruckStatus::Stopped, TruckStatus::Running) => To(TruckStatus::Running),
                (TruckStatus::Running, TruckStatus::Stopped) => To(TruckStatus::Stopped),
                _ => Unchanged,
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
