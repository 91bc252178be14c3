//! JSON payloads published over the messaging broker.
//!
//! Each truck publishes a full state snapshot and a position-only snapshot
//! every 100 ms. Both round-trip through serde without losing field values.
//!
//! # Topics (id = T)
//!
//! | Topic                   | Payload            | Direction |
//! |-------------------------|--------------------|-----------|
//! | `mine/truck/T/state`    | [`StateReport`]    | outbound  |
//! | `mine/truck/T/position` | [`PositionReport`] | outbound  |
//! | `mine/truck/T/command`  | `Command`          | inbound   |
//! | `mine/truck/T/route`    | `RouteRequest`     | inbound   |

use serde::{Deserialize, Serialize};

use crate::state::{Faults, Pose, TruckMode, TruckStatus};

/// Full state snapshot published on the state topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateReport {
    pub truck_id: u32,
    /// Unix time [s], fractional.
    pub timestamp: f64,
    pub position: Pose,
    /// Filtered linear speed [m/s].
    pub velocity: f64,
    /// Filtered engine temperature [°C].
    pub temperature: f64,
    pub status: TruckStatus,
    pub mode: TruckMode,
    pub faults: Faults,
}

/// Position-only snapshot published on the position topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionReport {
    pub truck_id: u32,
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

/// Outbound state topic for a truck id.
pub fn state_topic(truck_id: u32) -> String {
    format!("mine/truck/{truck_id}/state")
}

/// Outbound position topic for a truck id.
pub fn position_topic(truck_id: u32) -> String {
    format!("mine/truck/{truck_id}/position")
}

/// Inbound command topic for a truck id.
pub fn command_topic(truck_id: u32) -> String {
    format!("mine/truck/{truck_id}/command")
}

/// Inbound route topic for a truck id.
pub fn route_topic(truck_id: u32) -> String {
    format!("mine/truck/{truck_id}/route")
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> StateReport {
        StateReport {
            truck_id: 7,
            timestamp: 1_700_000_000.125,
            position: Pose {
                x: 12.345,
                y: -3.21,
                theta: 1.5707,
            },
            velocity: 4.2,
            temperature: 88.5,
            status: TruckStatus::Running,
            mode: TruckMode::AutomaticRemote,
            faults: Faults {
                electrical: false,
                hydraulic: true,
            },
        }
    }

    #[test]
    fn state_report_roundtrip() {
        let report = sample_report();
        let json = serde_json::to_string(&report).unwrap();
        let back: StateReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn state_report_field_names() {
        let json = serde_json::to_value(sample_report()).unwrap();
        assert_eq!(json["truck_id"], 7);
        assert_eq!(json["status"], "RUNNING");
        assert_eq!(json["mode"], "AUTOMATIC_REMOTE");
        assert_eq!(json["position"]["theta"], 1.5707);
        assert_eq!(json["faults"]["hydraulic"], true);
        assert_eq!(json["faults"]["electrical"], false);
    }

    #[test]
    fn position_report_roundtrip() {
        let report = PositionReport {
            truck_id: 3,
            x: 1.0,
            y: 2.0,
            theta: -0.5,
        };
        let json = serde_json::to_string(&report).unwrap();
        let back: PositionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn topic_names() {
        assert_eq!(state_topic(4), "mine/truck/4/state");
        assert_eq!(position_topic(4), "mine/truck/4/position");
        assert_eq!(command_topic(4), "mine/truck/4/command");
        assert_eq!(route_topic(4), "mine/truck/4/route");
    }
}
