//! Bounded ring of filtered sensor samples.
//!
//! Single producer (the sensor task), any number of readers. When full the
//! oldest sample is overwritten.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// One filtered sample, all channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredSample {
    /// Unix time [s].
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    pub velocity: f64,
    pub temperature: f64,
}

/// Fixed-capacity overwriting ring.
pub struct SampleRing {
    inner: Mutex<VecDeque<FilteredSample>>,
    capacity: usize,
}

impl SampleRing {
    /// Create a ring holding up to `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when full.
    pub fn push(&self, sample: FilteredSample) {
        let mut buf = self.inner.lock();
        if buf.len() == self.capacity {
            buf.pop_front();
        }
        buf.push_back(sample);
    }

    /// Most recent sample, if any.
    pub fn latest(&self) -> Option<FilteredSample> {
        self.inner.lock().back().copied()
    }

    /// Copy of the newest `n` samples, oldest first.
    pub fn snapshot_last(&self, n: usize) -> Vec<FilteredSample> {
        let buf = self.inner.lock();
        let skip = buf.len().saturating_sub(n);
        buf.iter().skip(skip).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
