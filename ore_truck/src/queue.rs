//! Bounded remote-command queue.
//!
//! Producers (messaging adapter, fault monitor) never block: when the
//! queue is full the oldest command is dropped and returned to the caller
//! for logging. The consumer (command logic) drains non-blocking each tick
//! or blocks with a bounded timeout.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ore_common::command::Command;
use parking_lot::{Condvar, Mutex};

/// Result of a non-blocking push.
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    /// Enqueued without loss.
    Accepted,
    /// Queue was full — the returned oldest command was evicted.
    DroppedOldest(Command),
}

/// Thread-safe bounded FIFO of [`Command`]s.
pub struct CommandQueue {
    inner: Mutex<VecDeque<Command>>,
    cond: Condvar,
    capacity: usize,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            cond: Condvar::new(),
            capacity,
        }
    }

    /// Enqueue without blocking; evicts the oldest entry when full.
    pub fn push(&self, command: Command) -> PushOutcome {
        let mut queue = self.inner.lock();
        let outcome = if queue.len() == self.capacity {
            let dropped = queue.pop_front();
            queue.push_back(command);
            match dropped {
                Some(old) => PushOutcome::DroppedOldest(old),
                None => PushOutcome::Accepted,
            }
        } else {
            queue.push_back(command);
            PushOutcome::Accepted
        };
        drop(queue);
        self.cond.notify_one();
        outcome
    }

    /// Dequeue without blocking.
    pub fn pop(&self) -> Option<Command> {
        self.inner.lock().pop_front()
    }

    /// Dequeue, blocking up to `timeout` for a command to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<Command> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.inner.lock();
        while queue.is_empty() {
            if self.cond.wait_until(&mut queue, deadline).timed_out() {
                break;
            }
        }
        queue.pop_front()
    }

    /// Take everything currently queued, in arrival order.
    pub fn drain(&self) -> Vec<Command> {
        self.inner.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ore_common::state::TruckStatus;

    #[test]
    fn fifo_order() {
        let q = CommandQueue::new(8);
        q.push(Command::Stop);
        q.push(Command::Reset);
        assert_eq!(q.pop(), Some(Command::Stop));
        assert_eq!(q.pop(), Some(Command::Reset));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn full_queue_drops_oldest() {
        let q = CommandQueue::new(2);
        assert_eq!(q.push(Command::Stop), PushOutcome::Accepted);
        assert_eq!(q.push(Command::Reset), PushOutcome::Accepted);
        let outcome = q.push(Command::SetStatus(TruckStatus::Running));
        assert_eq!(outcome, PushOutcome::DroppedOldest(Command::Stop));
        assert_eq!(q.len(), 2);
        // Newest survived, oldest is gone.
        let drained = q.drain();
        assert_eq!(
            drained,
            vec![Command::Reset, Command::SetStatus(TruckStatus::Running)]
        );
    }

    #[test]
    fn pop_timeout_expires_when_empty() {
        let q = CommandQueue::new(4);
        let start = Instant::now();
        assert_eq!(q.pop_timeout(Duration::from_millis(20)), None);
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn pop_timeout_wakes_on_push() {
        use std::sync::Arc;
        use std::thread;

        let q = Arc::new(CommandQueue::new(4));
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.pop_timeout(Duration::from_secs(2)))
        };
        thread::sleep(Duration::from_millis(20));
        q.push(Command::Emergency);
        assert_eq!(consumer.join().unwrap(), Some(Command::Emergency));
    }

    #[test]
    fn drain_empties_queue() {
        let q = CommandQueue::new(4);
        q.push(Command::Stop);
        q.push(Command::Emergency);
        assert_eq!(q.drain().len(), 2);
        assert!(q.is_empty());
    }
}
