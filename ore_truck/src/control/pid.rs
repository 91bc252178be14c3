//! Discrete PID with conditional-integration anti-windup and bumpless
//! re-initialization.
//!
//! The integral update is committed only when the raw output is not
//! saturating further in the error direction, so the accumulator never
//! grows while the output is pinned. [`Pid::reinit`] recomputes the
//! accumulator so the next output exactly equals a given value — used for
//! bumpless transfer on control-mode changes.

use ore_common::config::PidSettings;

/// One discrete PID loop.
#[derive(Debug, Clone)]
pub struct Pid {
    kp: f64,
    ki: f64,
    kd: f64,
    out_min: f64,
    out_max: f64,
    integral: f64,
    prev_error: f64,
}

impl Pid {
    pub fn new(settings: &PidSettings) -> Self {
        Self {
            kp: settings.kp,
            ki: settings.ki,
            kd: settings.kd,
            out_min: settings.out_min,
            out_max: settings.out_max,
            integral: 0.0,
            prev_error: 0.0,
        }
    }

    /// Compute one tick.
    ///
    /// The integral candidate participates in the raw output; it is only
    /// committed when the output is not saturated in the error direction.
    pub fn step(&mut self, setpoint: f64, measurement: f64, dt: f64) -> f64 {
        if dt <= 0.0 {
            return 0.0;
        }

        let error = setpoint - measurement;
        let integral_next = self.integral + error * dt;
        let derivative = (error - self.prev_error) / dt;

        let raw = self.kp * error + self.ki * integral_next + self.kd * derivative;
        let output = raw.clamp(self.out_min, self.out_max);

        let pushing_into_saturation =
            (raw > self.out_max && error > 0.0) || (raw < self.out_min && error < 0.0);
        if !pushing_into_saturation {
            self.integral = integral_next;
        }
        self.prev_error = error;

        output
    }

    /// Tick with the integral frozen — used while EMERGENCY is latched so
    /// the proportional/derivative state stays fresh without windup.
    pub fn step_held(&mut self, setpoint: f64, measurement: f64, dt: f64) -> f64 {
        if dt <= 0.0 {
            return 0.0;
        }

        let error = setpoint - measurement;
        let derivative = (error - self.prev_error) / dt;
        self.prev_error = error;

        (self.kp * error + self.ki * self.integral + self.kd * derivative)
            .clamp(self.out_min, self.out_max)
    }

    /// Bumpless re-initialization.
    ///
    /// Seeds the accumulator and previous error so that the next
    /// [`Pid::step`] with the same setpoint/measurement returns exactly
    /// `output` (clamped to the saturation range). With a zero integral
    /// gain only the previous error can be seeded.
    pub fn reinit(&mut self, output: f64, setpoint: f64, measurement: f64, dt: f64) {
        let error = setpoint - measurement;
        self.prev_error = error;

        if self.ki != 0.0 && dt > 0.0 {
            let target = output.clamp(self.out_min, self.out_max);
            // Next step adds error·dt before evaluating, so pre-subtract it.
            self.integral = (target - self.kp * error) / self.ki - error * dt;
        }
    }

    /// Zero all internal state.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }

    /// Current integral accumulator (diagnostics and tests).
    #[inline]
    pub fn integral(&self) -> f64 {
        self.integral
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 0.05;

    fn settings(kp: f64, ki: f64, kd: f64, sat: f64) -> PidSettings {
        PidSettings {
            kp,
            ki,
            kd,
            out_min: -sat,
            out_max: sat,
        }
    }

    #[test]
    fn pure_proportional() {
        let mut pid = Pid::new(&settings(2.0, 0.0, 0.0, 100.0));
        let out = pid.step(3.0, 1.0, DT);
        assert!((out - 4.0).abs() < 1e-12);
    }

    #[test]
    fn zero_dt_returns_zero() {
        let mut pid = Pid::new(&settings(2.0, 0.1, 0.0, 10.0));
        assert_eq!(pid.step(5.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn integral_accumulates() {
        let mut pid = Pid::new(&settings(0.0, 1.0, 0.0, 100.0));
        for _ in 0..10 {
            pid.step(1.0, 0.0, DT);
        }
        // integral = error · dt · n = 1.0 · 0.05 · 10
        assert!((pid.integral() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn output_always_within_saturation() {
        let mut pid = Pid::new(&settings(10.0, 1.0, 0.1, 2.0));
        for i in 0..200 {
            let sp = if i % 2 == 0 { 50.0 } else { -50.0 };
            let out = pid.step(sp, 0.0, DT);
            assert!((-2.0..=2.0).contains(&out), "output {out} escaped saturation");
        }
    }

    #[test]
    fn integral_does_not_grow_while_saturated() {
        let mut pid = Pid::new(&settings(1.0, 1.0, 0.0, 1.0));
        // Large constant error drives the output to the upper limit.
        pid.step(100.0, 0.0, DT);
        let frozen = pid.integral();
        for _ in 0..100 {
            pid.step(100.0, 0.0, DT);
            assert!(
                pid.integral() <= frozen + 1e-12,
                "integral grew during saturation"
            );
        }
    }

    #[test]
    fn integral_recovers_after_saturation() {
        let mut pid = Pid::new(&settings(1.0, 1.0, 0.0, 1.0));
        for _ in 0..20 {
            pid.step(100.0, 0.0, DT);
        }
        // Error reverses; the loop must leave saturation promptly.
        let out = pid.step(-1.0, 0.0, DT);
        assert!(out < 1.0);
    }

    #[test]
    fn reinit_is_bumpless() {
        let mut pid = Pid::new(&settings(0.5, 0.1, 0.05, 10.0));
        pid.reinit(3.0, 3.0, 2.9, DT);
        let out = pid.step(3.0, 2.9, DT);
        assert!((out - 3.0).abs() < 1e-9, "first output {out} bumped");
    }

    #[test]
    fn reinit_with_zero_error_is_exact() {
        let mut pid = Pid::new(&settings(0.5, 0.1, 0.05, 10.0));
        pid.reinit(3.0, 5.0, 5.0, DT);
        let out = pid.step(5.0, 5.0, DT);
        assert!((out - 3.0).abs() < 1e-12);
    }

    #[test]
    fn reinit_clamps_to_saturation() {
        let mut pid = Pid::new(&settings(0.5, 0.1, 0.0, 1.0));
        pid.reinit(50.0, 0.0, 0.0, DT);
        let out = pid.step(0.0, 0.0, DT);
        assert!((out - 1.0).abs() < 1e-9);
    }

    #[test]
    fn held_step_freezes_integral() {
        let mut pid = Pid::new(&settings(0.5, 0.1, 0.0, 10.0));
        for _ in 0..10 {
            pid.step(5.0, 0.0, DT);
        }
        let before = pid.integral();
        for _ in 0..10 {
            pid.step_held(0.0, 0.0, DT);
        }
        assert_eq!(pid.integral(), before);
    }

    #[test]
    fn reset_clears_state() {
        let mut pid = Pid::new(&settings(0.5, 0.1, 0.05, 10.0));
        for _ in 0..10 {
            pid.step(5.0, 0.0, DT);
        }
        pid.reset();
        assert_eq!(pid.integral(), 0.0);
        let out = pid.step(0.0, 0.0, DT);
        assert_eq!(out, 0.0);
    }
}
