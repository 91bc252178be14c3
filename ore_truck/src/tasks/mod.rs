//! Periodic cooperating tasks.
//!
//! Each task is a struct whose `tick()` does one period of work; the
//! thread loops live in [`crate::runtime`]. The [`TaskContext`] bundles
//! the shared substrate every task is spawned with.

pub mod collector;
pub mod fault;
pub mod logic;
pub mod navigation;
pub mod route;
pub mod sensors;
pub mod simulator;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use ore_common::command::Command;
use ore_common::config::TruckConfig;
use parking_lot::Mutex;
use tracing::warn;

use crate::control::dynamics::{Actuation, RawSample};
use crate::events::EventHub;
use crate::queue::{CommandQueue, PushOutcome};
use crate::ring::SampleRing;
use crate::store::StateStore;

/// Shared substrate handed to every task at spawn time.
#[derive(Clone)]
pub struct TaskContext {
    pub config: Arc<TruckConfig>,
    pub store: Arc<StateStore>,
    pub ring: Arc<SampleRing>,
    pub events: Arc<EventHub>,
    pub commands: Arc<CommandQueue>,
    /// Latest actuation command, navigation → simulator.
    pub actuation: Arc<Mutex<Actuation>>,
    /// Latest raw sensor sample, simulator → sensor task.
    pub raw_feed: Arc<Mutex<Option<RawSample>>>,
    pub shutdown: Arc<AtomicBool>,
}

impl TaskContext {
    pub fn new(config: TruckConfig, truck_id: u32) -> Self {
        let store = StateStore::new(truck_id, config.dynamics.base_temperature);
        let ring = SampleRing::new(config.ring_capacity);
        let commands = CommandQueue::new(config.command_queue_capacity);
        Self {
            store: Arc::new(store),
            ring: Arc::new(ring),
            events: Arc::new(EventHub::new()),
            commands: Arc::new(commands),
            actuation: Arc::new(Mutex::new(Actuation::default())),
            raw_feed: Arc::new(Mutex::new(None)),
            shutdown: Arc::new(AtomicBool::new(false)),
            config: Arc::new(config),
        }
    }
}

/// Enqueue a command without blocking, recording queue overflow.
pub fn enqueue_command(queue: &CommandQueue, store: &StateStore, command: Command) {
    match queue.push(command) {
        PushOutcome::Accepted => {}
        PushOutcome::DroppedOldest(old) => {
            warn!(dropped = ?old, "command queue full, dropped oldest command");
            store.record_event("command queue overflow: oldest command dropped");
        }
    }
}

/// Monotonic period pacing.
///
/// The next wake is scheduled from the previous boundary, not from `now`,
/// so sleep jitter does not drift the schedule. A tick that overruns its
/// boundary is counted and the schedule rebased instead of bursting to
/// catch up.
pub struct Ticker {
    period: Duration,
    next: Instant,
    /// Boundaries passed so far.
    pub ticks: u64,
    /// Boundaries missed (work ran past the deadline).
    pub overruns: u64,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
            ticks: 0,
            overruns: 0,
        }
    }

    /// Deadline of the current period, for event-based waits.
    pub fn next_deadline(&self) -> Instant {
        self.next
    }

    /// Sleep until the next boundary, then advance the schedule.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if now < self.next {
            std::thread::sleep(self.next - now);
        }
        self.advance();
    }

    /// Advance the schedule without sleeping (the caller already waited,
    /// e.g. on a condition variable, up to [`Ticker::next_deadline`]).
    pub fn advance(&mut self) {
        self.ticks += 1;
        let now = Instant::now();
        if now > self.next {
            self.overruns += 1;
        }
        self.next += self.period;
        if self.next <= now {
            // Far behind schedule — rebase rather than burst.
            self.next = now + self.period;
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_paces_without_drift() {
        let mut ticker = Ticker::new(Duration::from_millis(5));
        let start = Instant::now();
        for _ in 0..4 {
            ticker.wait();
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(18), "elapsed {elapsed:?}");
        assert_eq!(ticker.ticks, 4);
    }

    #[test]
    fn ticker_counts_overruns_and_rebases() {
        let mut ticker = Ticker::new(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));
        ticker.advance();
        assert_eq!(ticker.overruns, 1);
        // Schedule rebased into the future.
        assert!(ticker.next_deadline() > Instant::now() - Duration::from_millis(1));
    }

    #[test]
    fn enqueue_records_overflow() {
        let queue = CommandQueue::new(1);
        let store = StateStore::new(1, 80.0);
        enqueue_command(&queue, &store, Command::Stop);
        enqueue_command(&queue, &store, Command::Reset);
        assert!(store.snapshot().last_event.contains("overflow"));
        // Newest command survived.
        assert_eq!(queue.pop(), Some(Command::Reset));
    }
}
