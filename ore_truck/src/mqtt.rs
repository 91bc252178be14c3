//! Messaging adapter: MQTT bridge to the mine supervisor.
//!
//! Two threads. Inbound subscribes to the per-truck command and route
//! topics, translates JSON payloads into [`Command`]s and enqueues them
//! without blocking; malformed or unknown payloads are dropped with a
//! warning. Outbound publishes state and position snapshots every 100 ms.
//!
//! Disconnects are survived: the connection loop backs off exponentially
//! (100 ms → 5 s) and re-subscribes on every reconnect, while outbound
//! publishes during an outage are silently dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use ore_common::command::{Command, RouteRequest};
use ore_common::wire::{self, PositionReport, StateReport};
use rumqttc::{Client, Event, MqttOptions, Packet, QoS};
use tracing::{debug, info, warn};

use crate::queue::CommandQueue;
use crate::store::{StateStore, VehicleState};
use crate::tasks::{TaskContext, Ticker, enqueue_command};
use crate::unix_now;

/// Outbound snapshot period.
const PUBLISH_PERIOD: Duration = Duration::from_millis(100);
/// How long the inbound loop blocks before re-checking shutdown.
const RECV_TIMEOUT: Duration = Duration::from_millis(500);
const BACKOFF_MIN: Duration = Duration::from_millis(100);
const BACKOFF_MAX: Duration = Duration::from_secs(5);

/// Handle to the adapter threads.
pub struct MqttAdapter {
    client: Client,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl MqttAdapter {
    /// Connect to the broker and spawn the inbound/outbound threads.
    pub fn spawn(ctx: &TaskContext, truck_id: u32) -> std::io::Result<Self> {
        let broker = &ctx.config.broker;
        let mut options = MqttOptions::new(
            format!("ore-truck-{truck_id}"),
            broker.host.clone(),
            broker.port,
        );
        options.set_keep_alive(Duration::from_secs(broker.keep_alive_s));

        let (client, mut connection) = Client::new(options, 16);
        info!(host = %broker.host, port = broker.port, "messaging adapter starting");

        let mut handles = Vec::new();

        // Inbound: broker events → command queue.
        {
            let shutdown = Arc::clone(&ctx.shutdown);
            let store = Arc::clone(&ctx.store);
            let queue = Arc::clone(&ctx.commands);
            let subscriber = client.clone();
            let handle = std::thread::Builder::new()
                .name("mqtt-in".to_string())
                .spawn(move || {
                    inbound_loop(&mut connection, &subscriber, truck_id, &shutdown, &store, &queue);
                })?;
            handles.push(("mqtt-in", handle));
        }

        // Outbound: state snapshots → broker.
        {
            let shutdown = Arc::clone(&ctx.shutdown);
            let store = Arc::clone(&ctx.store);
            let publisher = client.clone();
            let handle = std::thread::Builder::new()
                .name("mqtt-out".to_string())
                .spawn(move || {
                    outbound_loop(&publisher, truck_id, &shutdown, &store);
                })?;
            handles.push(("mqtt-out", handle));
        }

        Ok(Self { client, handles })
    }

    /// Ask the broker connection to close; threads exit via the shutdown
    /// flag within one receive timeout.
    pub fn disconnect(&self) {
        let _ = self.client.disconnect();
    }

    /// Hand the thread handles to the runtime for joining.
    pub fn into_handles(self) -> Vec<(&'static str, JoinHandle<()>)> {
        self.handles
    }
}

fn inbound_loop(
    connection: &mut rumqttc::Connection,
    client: &Client,
    truck_id: u32,
    shutdown: &AtomicBool,
    store: &StateStore,
    queue: &CommandQueue,
) {
    let command_topic = wire::command_topic(truck_id);
    let route_topic = wire::route_topic(truck_id);
    let mut backoff = BACKOFF_MIN;

    while !shutdown.load(Ordering::Relaxed) {
        match connection.recv_timeout(RECV_TIMEOUT) {
            Ok(Ok(Event::Incoming(Packet::ConnAck(_)))) => {
                info!("broker connected");
                backoff = BACKOFF_MIN;
                // Subscriptions do not survive a reconnect.
                for topic in [command_topic.as_str(), route_topic.as_str()] {
                    if let Err(e) = client.subscribe(topic, QoS::AtMostOnce) {
                        warn!(%topic, "subscribe failed: {e}");
                    }
                }
            }
            Ok(Ok(Event::Incoming(Packet::Publish(publish)))) => {
                handle_inbound(
                    &publish.topic,
                    &publish.payload,
                    &command_topic,
                    &route_topic,
                    store,
                    queue,
                );
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                warn!("broker connection error: {e}, retrying in {backoff:?}");
                std::thread::sleep(backoff);
                backoff = (backoff * 2).min(BACKOFF_MAX);
            }
            // Receive timeout: loop around to observe the shutdown flag.
            Err(_) => {}
        }
    }
    debug!("inbound adapter stopped");
}

/// Translate one inbound publish into a queued command.
fn handle_inbound(
    topic: &str,
    payload: &[u8],
    command_topic: &str,
    route_topic: &str,
    store: &StateStore,
    queue: &CommandQueue,
) {
    if topic == command_topic {
        match serde_json::from_slice::<Command>(payload) {
            Ok(command) => {
                debug!(?command, "command received");
                enqueue_command(queue, store, command);
            }
            Err(e) => warn!("dropped malformed command payload: {e}"),
        }
    } else if topic == route_topic {
        match serde_json::from_slice::<RouteRequest>(payload) {
            Ok(request) => {
                debug!(waypoints = request.waypoints.len(), "route received");
                enqueue_command(queue, store, Command::SetRoute(request.waypoints));
            }
            Err(e) => warn!("dropped malformed route payload: {e}"),
        }
    } else {
        debug!(%topic, "publish on unexpected topic ignored");
    }
}

fn outbound_loop(client: &Client, truck_id: u32, shutdown: &AtomicBool, store: &StateStore) {
    let state_topic = wire::state_topic(truck_id);
    let position_topic = wire::position_topic(truck_id);
    let mut ticker = Ticker::new(PUBLISH_PERIOD);

    while !shutdown.load(Ordering::Relaxed) {
        let snap = store.snapshot();
        let (state, position) = build_reports(&snap, unix_now());

        // Publishes are best-effort; during a disconnect they are dropped.
        match serde_json::to_vec(&state) {
            Ok(bytes) => {
                if let Err(e) =
                    client.try_publish(state_topic.as_str(), QoS::AtMostOnce, false, bytes)
                {
                    debug!("state publish dropped: {e}");
                }
            }
            Err(e) => warn!("state serialization failed: {e}"),
        }
        match serde_json::to_vec(&position) {
            Ok(bytes) => {
                if let Err(e) =
                    client.try_publish(position_topic.as_str(), QoS::AtMostOnce, false, bytes)
                {
                    debug!("position publish dropped: {e}");
                }
            }
            Err(e) => warn!("position serialization failed: {e}"),
        }

        ticker.wait();
    }
    debug!("outbound adapter stopped");
}

/// Build the outbound payload pair from a state snapshot.
fn build_reports(snap: &VehicleState, timestamp: f64) -> (StateReport, PositionReport) {
    (
        StateReport {
            truck_id: snap.truck_id,
            timestamp,
            position: snap.pose,
            velocity: snap.velocity,
            temperature: snap.temperature,
            status: snap.status,
            mode: snap.mode,
            faults: snap.faults,
        },
        PositionReport {
            truck_id: snap.truck_id,
            x: snap.pose.x,
            y: snap.pose.y,
            theta: snap.pose.theta,
        },
    )
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ore_common::state::{TruckMode, TruckStatus, Waypoint};

    fn substrate() -> (Arc<StateStore>, Arc<CommandQueue>) {
        (
            Arc::new(StateStore::new(7, 80.0)),
            Arc::new(CommandQueue::new(8)),
        )
    }

    #[test]
    fn command_payload_is_enqueued() {
        let (store, queue) = substrate();
        handle_inbound(
            "mine/truck/7/command",
            br#"{"type":"SET_STATUS","value":"RUNNING"}"#,
            "mine/truck/7/command",
            "mine/truck/7/route",
            &store,
            &queue,
        );
        assert_eq!(queue.pop(), Some(Command::SetStatus(TruckStatus::Running)));
    }

    #[test]
    fn route_payload_becomes_set_route() {
        let (store, queue) = substrate();
        handle_inbound(
            "mine/truck/7/route",
            br#"{"waypoints":[[10.0,0.0],[10.0,10.0]]}"#,
            "mine/truck/7/command",
            "mine/truck/7/route",
            &store,
            &queue,
        );
        assert_eq!(
            queue.pop(),
            Some(Command::SetRoute(vec![
                Waypoint::new(10.0, 0.0),
                Waypoint::new(10.0, 10.0)
            ]))
        );
    }

    #[test]
    fn malformed_payloads_are_dropped() {
        let (store, queue) = substrate();
        handle_inbound(
            "mine/truck/7/command",
            br#"{"type":"WARP_DRIVE"}"#,
            "mine/truck/7/command",
            "mine/truck/7/route",
            &store,
            &queue,
        );
        handle_inbound(
            "mine/truck/7/route",
            b"not json",
            "mine/truck/7/command",
            "mine/truck/7/route",
            &store,
            &queue,
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn unexpected_topic_ignored() {
        let (store, queue) = substrate();
        handle_inbound(
            "mine/truck/8/command",
            br#"{"type":"STOP"}"#,
            "mine/truck/7/command",
            "mine/truck/7/route",
            &store,
            &queue,
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn reports_mirror_snapshot() {
        let (store, _) = substrate();
        store.update(|s| {
            s.status = TruckStatus::Running;
            s.mode = TruckMode::AutomaticRemote;
            s.pose.x = 3.0;
            s.pose.theta = 0.5;
            s.velocity = 4.5;
        });
        let snap = store.snapshot();
        let (state, position) = build_reports(&snap, 123.5);

        assert_eq!(state.truck_id, 7);
        assert_eq!(state.timestamp, 123.5);
        assert_eq!(state.status, TruckStatus::Running);
        assert_eq!(state.position.x, 3.0);
        assert_eq!(position.theta, 0.5);

        // Wire round-trip preserves the snapshot values.
        let json = serde_json::to_string(&state).unwrap();
        let back: StateReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
