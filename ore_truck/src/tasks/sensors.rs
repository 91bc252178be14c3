//! Sensor processing task (10 Hz).
//!
//! Pulls the simulator's latest raw sample, rejects transient glitches
//! (NaN or implausible magnitudes), smooths every channel with a window-M
//! moving average (wrap-aware for the heading), writes the filtered values
//! into the shared state and appends a [`FilteredSample`] to the ring.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::control::dynamics::RawSample;
use crate::control::filter::{HeadingAverage, MovingAverage};
use crate::ring::{FilteredSample, SampleRing};
use crate::store::StateStore;

/// Plausibility bounds for raw samples; beyond these the sample is a
/// glitch, not a measurement.
const MAX_PLAUSIBLE_POSITION_M: f64 = 1.0e5;
const MAX_PLAUSIBLE_VELOCITY_MPS: f64 = 50.0;
const PLAUSIBLE_TEMPERATURE_C: std::ops::RangeInclusive<f64> = -60.0..=250.0;

pub struct SensorTask {
    raw_feed: Arc<Mutex<Option<RawSample>>>,
    store: Arc<StateStore>,
    ring: Arc<SampleRing>,
    filter_x: MovingAverage,
    filter_y: MovingAverage,
    filter_theta: HeadingAverage,
    filter_velocity: MovingAverage,
    filter_temperature: MovingAverage,
    discarded: u64,
}

impl SensorTask {
    pub fn new(
        raw_feed: Arc<Mutex<Option<RawSample>>>,
        store: Arc<StateStore>,
        ring: Arc<SampleRing>,
        window: usize,
    ) -> Self {
        Self {
            raw_feed,
            store,
            ring,
            filter_x: MovingAverage::new(window),
            filter_y: MovingAverage::new(window),
            filter_theta: HeadingAverage::new(window),
            filter_velocity: MovingAverage::new(window),
            filter_temperature: MovingAverage::new(window),
            discarded: 0,
        }
    }

    pub fn tick(&mut self) {
        let Some(raw) = *self.raw_feed.lock() else {
            return;
        };

        if !Self::plausible(&raw) {
            self.discarded += 1;
            debug!(discarded = self.discarded, "discarded implausible sensor sample");
            return;
        }

        let x = self.filter_x.push(raw.x);
        let y = self.filter_y.push(raw.y);
        let theta = self.filter_theta.push(raw.theta);
        let velocity = self.filter_velocity.push(raw.velocity);
        let temperature = self.filter_temperature.push(raw.temperature);

        self.store.update(|s| {
            s.pose.x = x;
            s.pose.y = y;
            s.pose.theta = theta;
            s.velocity = velocity;
            s.temperature = temperature;
        });

        self.ring.push(FilteredSample {
            timestamp: raw.timestamp,
            x,
            y,
            theta,
            velocity,
            temperature,
        });
    }

    fn plausible(raw: &RawSample) -> bool {
        let finite = raw.x.is_finite()
            && raw.y.is_finite()
            && raw.theta.is_finite()
            && raw.velocity.is_finite()
            && raw.temperature.is_finite();
        finite
            && raw.x.abs() <= MAX_PLAUSIBLE_POSITION_M
            && raw.y.abs() <= MAX_PLAUSIBLE_POSITION_M
            && raw.velocity.abs() <= MAX_PLAUSIBLE_VELOCITY_MPS
            && PLAUSIBLE_TEMPERATURE_C.contains(&raw.temperature)
    }

    /// Number of samples rejected as glitches.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> SensorTask {
        SensorTask::new(
            Arc::new(Mutex::new(None)),
            Arc::new(StateStore::new(1, 80.0)),
            Arc::new(SampleRing::new(16)),
            5,
        )
    }

    fn raw(x: f64, velocity: f64, temperature: f64) -> RawSample {
        RawSample {
            timestamp: 1.0,
            x,
            y: 0.0,
            theta: 0.0,
            velocity,
            temperature,
        }
    }

    #[test]
    fn no_sample_is_a_noop() {
        let mut task = task();
        task.tick();
        assert!(task.ring.is_empty());
    }

    #[test]
    fn filters_into_store_and_ring() {
        let mut task = task();
        for x in [1.0, 2.0, 3.0] {
            *task.raw_feed.lock() = Some(raw(x, 1.0, 80.0));
            task.tick();
        }
        let snap = task.store.snapshot();
        assert!((snap.pose.x - 2.0).abs() < 1e-9);
        assert_eq!(task.ring.len(), 3);
    }

    #[test]
    fn nan_sample_discarded_window_retained() {
        let mut task = task();
        *task.raw_feed.lock() = Some(raw(4.0, 1.0, 80.0));
        task.tick();
        let before = task.store.snapshot().pose.x;

        *task.raw_feed.lock() = Some(raw(f64::NAN, 1.0, 80.0));
        task.tick();

        assert_eq!(task.discarded(), 1);
        // Prior filtered value untouched.
        assert_eq!(task.store.snapshot().pose.x, before);
        assert_eq!(task.ring.len(), 1);
    }

    #[test]
    fn out_of_range_discarded() {
        let mut task = task();
        *task.raw_feed.lock() = Some(raw(0.0, 500.0, 80.0));
        task.tick();
        *task.raw_feed.lock() = Some(raw(0.0, 1.0, 900.0));
        task.tick();
        assert_eq!(task.discarded(), 2);
        assert!(task.ring.is_empty());
    }
}
