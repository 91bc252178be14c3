//! Moving-average smoothing for the sensor channels.
//!
//! Plain channels use an arithmetic window mean; the heading channel
//! averages sine and cosine components and recombines with `atan2`, since
//! a naive mean is wrong near the ±π seam.

use std::collections::VecDeque;

use super::wrap_angle;

/// Window-M arithmetic moving average.
///
/// Before M samples arrive the mean covers the samples seen so far.
/// Stateful and not thread-safe — owned by the sensor task.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: usize,
    samples: VecDeque<f64>,
    sum: f64,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            samples: VecDeque::with_capacity(window.max(1)),
            sum: 0.0,
        }
    }

    /// Push a raw value and return the current mean.
    pub fn push(&mut self, value: f64) -> f64 {
        if self.samples.len() == self.window {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= oldest;
            }
        }
        self.samples.push_back(value);
        self.sum += value;
        self.sum / self.samples.len() as f64
    }

    /// Mean of the current window without pushing.
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            None
        } else {
            Some(self.sum / self.samples.len() as f64)
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.sum = 0.0;
    }
}

/// Wrap-aware heading average over the same window M.
#[derive(Debug, Clone)]
pub struct HeadingAverage {
    sin: MovingAverage,
    cos: MovingAverage,
}

impl HeadingAverage {
    pub fn new(window: usize) -> Self {
        Self {
            sin: MovingAverage::new(window),
            cos: MovingAverage::new(window),
        }
    }

    /// Push a raw heading [rad] and return the smoothed heading in
    /// (−π, π].
    pub fn push(&mut self, theta: f64) -> f64 {
        let s = self.sin.push(theta.sin());
        let c = self.cos.push(theta.cos());
        wrap_angle(s.atan2(c))
    }

    pub fn reset(&mut self) {
        self.sin.reset();
        self.cos.reset();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn partial_window_averages_seen_samples() {
        let mut ma = MovingAverage::new(5);
        assert_eq!(ma.push(2.0), 2.0);
        assert_eq!(ma.push(4.0), 3.0);
        assert_eq!(ma.push(6.0), 4.0);
    }

    #[test]
    fn full_window_slides() {
        let mut ma = MovingAverage::new(3);
        for v in [1.0, 2.0, 3.0] {
            ma.push(v);
        }
        // Window is now [2, 3, 4].
        assert!((ma.push(4.0) - 3.0).abs() < 1e-12);
        // Window is now [3, 4, 5].
        assert!((ma.push(5.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn mean_without_push() {
        let mut ma = MovingAverage::new(4);
        assert!(ma.mean().is_none());
        ma.push(10.0);
        assert_eq!(ma.mean(), Some(10.0));
    }

    #[test]
    fn reset_clears_window() {
        let mut ma = MovingAverage::new(3);
        ma.push(100.0);
        ma.reset();
        assert!(ma.mean().is_none());
        assert_eq!(ma.push(1.0), 1.0);
    }

    #[test]
    fn heading_average_handles_pi_seam() {
        let mut ha = HeadingAverage::new(4);
        // Samples straddling ±π: naive mean would be ~0, the true average
        // heading is π.
        ha.push(PI - 0.05);
        ha.push(-PI + 0.05);
        ha.push(PI - 0.03);
        let avg = ha.push(-PI + 0.03);
        assert!(
            (wrap_angle(avg - PI)).abs() < 0.05,
            "average {avg} not near ±π"
        );
    }

    #[test]
    fn heading_average_plain_region() {
        let mut ha = HeadingAverage::new(3);
        ha.push(0.1);
        ha.push(0.2);
        let avg = ha.push(0.3);
        assert!((avg - 0.2).abs() < 1e-3);
    }

    #[test]
    fn heading_average_stays_wrapped() {
        let mut ha = HeadingAverage::new(2);
        for theta in [3.0, -3.0, 3.1, -3.1] {
            let avg = ha.push(theta);
            assert!(avg > -PI && avg <= PI);
        }
    }
}
