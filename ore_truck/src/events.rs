//! Enum-keyed notification hub.
//!
//! A small fixed set of named events backed by condition variables and
//! generation counters. Waits always loop on the generation predicate, so
//! spurious wakeups are harmless, and every wait carries a deadline so
//! shutdown is observed within one task period.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// The fixed event set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum TruckEvent {
    /// Fault monitor detected a new fault — wakes the command logic.
    Fault = 0,
    /// Control mode changed — navigation re-initializes its loops.
    ModeChange = 1,
    /// Global shutdown — every task exits at its next wait.
    Shutdown = 2,
}

const EVENT_COUNT: usize = 3;

struct Slot {
    generation: Mutex<u64>,
    cond: Condvar,
}

impl Slot {
    fn new() -> Self {
        Self {
            generation: Mutex::new(0),
            cond: Condvar::new(),
        }
    }
}

/// Condition-variable registry keyed by [`TruckEvent`].
pub struct EventHub {
    slots: [Slot; EVENT_COUNT],
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            slots: [Slot::new(), Slot::new(), Slot::new()],
        }
    }

    #[inline]
    fn slot(&self, event: TruckEvent) -> &Slot {
        &self.slots[event as usize]
    }

    /// Bump the event generation and wake one waiter.
    pub fn signal(&self, event: TruckEvent) {
        let slot = self.slot(event);
        *slot.generation.lock() += 1;
        slot.cond.notify_one();
    }

    /// Bump the event generation and wake every waiter.
    pub fn broadcast(&self, event: TruckEvent) {
        let slot = self.slot(event);
        *slot.generation.lock() += 1;
        slot.cond.notify_all();
    }

    /// Current generation counter; pair with [`EventHub::wait_newer`].
    pub fn generation(&self, event: TruckEvent) -> u64 {
        *self.slot(event).generation.lock()
    }

    /// Wait until the generation exceeds `last_seen` or the timeout runs
    /// out. Returns the generation observed on exit.
    pub fn wait_newer(&self, event: TruckEvent, last_seen: u64, timeout: Duration) -> u64 {
        self.wait_deadline(event, last_seen, Instant::now() + timeout)
    }

    /// Deadline form of [`EventHub::wait_newer`], for periodic tasks that
    /// sleep on an event instead of a bare timer.
    pub fn wait_deadline(&self, event: TruckEvent, last_seen: u64, deadline: Instant) -> u64 {
        let slot = self.slot(event);
        let mut generation = slot.generation.lock();
        while *generation <= last_seen {
            if slot.cond.wait_until(&mut generation, deadline).timed_out() {
                break;
            }
        }
        *generation
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
