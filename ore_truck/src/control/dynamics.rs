//! Simulated vehicle dynamics.
//!
//! First-order lag on commanded linear and angular velocity, clamped to
//! the physical limits, with planar pose integration and a slow thermal
//! model. The internal state is ground truth; Gaussian noise is applied
//! only to the emitted sensor samples.

use ore_common::config::DynamicsSettings;
use ore_common::state::Pose;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use super::wrap_angle;

/// Velocity command pair written by the navigation controller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Actuation {
    /// Commanded linear velocity [m/s].
    pub velocity: f64,
    /// Commanded angular velocity [rad/s].
    pub angular: f64,
}

/// Raw (noisy) sensor sample emitted by the simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Unix time [s].
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    pub velocity: f64,
    pub temperature: f64,
}

/// First-order-lag truck model.
pub struct TruckDynamics {
    settings: DynamicsSettings,
    allow_reverse: bool,
    x: f64,
    y: f64,
    theta: f64,
    velocity: f64,
    angular_velocity: f64,
    temperature: f64,
    rng: SmallRng,
}

impl TruckDynamics {
    pub fn new(settings: DynamicsSettings, allow_reverse: bool) -> Self {
        let rng = match settings.noise_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Self {
            allow_reverse,
            x: 0.0,
            y: 0.0,
            theta: 0.0,
            velocity: 0.0,
            angular_velocity: 0.0,
            temperature: settings.base_temperature,
            rng,
            settings,
        }
    }

    /// Advance the model by `dt` seconds under the given command.
    pub fn step(&mut self, command: &Actuation, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let s = &self.settings;

        let v_floor = if self.allow_reverse { -s.max_velocity } else { 0.0 };
        let v_cmd = command.velocity.clamp(v_floor, s.max_velocity);
        let w_cmd = command.angular.clamp(-s.max_angular, s.max_angular);

        let alpha = (dt / s.tau_s).min(1.0);
        self.velocity = (self.velocity + (v_cmd - self.velocity) * alpha)
            .clamp(-s.max_velocity, s.max_velocity);
        self.angular_velocity = (self.angular_velocity
            + (w_cmd - self.angular_velocity) * alpha)
            .clamp(-s.max_angular, s.max_angular);

        self.x += self.velocity * self.theta.cos() * dt;
        self.y += self.velocity * self.theta.sin() * dt;
        self.theta = wrap_angle(self.theta + self.angular_velocity * dt);

        // Engine heats with speed, relaxing toward its load-dependent target.
        let temp_target = s.base_temperature + s.temp_rise_per_mps * self.velocity.abs();
        self.temperature += (temp_target - self.temperature) * (dt / s.temp_tau_s).min(1.0);
    }

    /// Emit a noisy sensor sample of the current state.
    pub fn observe(&mut self, timestamp: f64) -> RawSample {
        let s = self.settings;
        RawSample {
            timestamp,
            x: self.x + s.sigma_xy * self.gauss(),
            y: self.y + s.sigma_xy * self.gauss(),
            theta: wrap_angle(self.theta + s.sigma_theta * self.gauss()),
            velocity: self.velocity + s.sigma_velocity * self.gauss(),
            temperature: self.temperature + s.sigma_temperature * self.gauss(),
        }
    }

    #[inline]
    fn gauss(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }

    /// Ground-truth pose.
    pub fn pose(&self) -> Pose {
        Pose {
            x: self.x,
            y: self.y,
            theta: self.theta,
        }
    }

    /// Ground-truth linear velocity [m/s].
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Ground-truth angular velocity [rad/s].
    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    /// Ground-truth engine temperature [°C].
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Override the engine temperature (fault-injection hook).
    pub fn set_temperature(&mut self, celsius: f64) {
        self.temperature = celsius;
    }

    /// Place the truck at a pose (test setup).
    pub fn set_pose(&mut self, pose: Pose) {
        self.x = pose.x;
        self.y = pose.y;
        self.theta = wrap_angle(pose.theta);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn quiet_settings() -> DynamicsSettings {
        DynamicsSettings {
            sigma_xy: 0.0,
            sigma_theta: 0.0,
            sigma_velocity: 0.0,
            sigma_temperature: 0.0,
            noise_seed: Some(7),
            ..DynamicsSettings::default()
        }
    }

    #[test]
    fn velocity_converges_to_command() {
        let mut dyn_ = TruckDynamics::new(quiet_settings(), false);
        let cmd = Actuation {
            velocity: 5.0,
            angular: 0.0,
        };
        // 5 s ≫ τ = 0.5 s.
        for _ in 0..100 {
            dyn_.step(&cmd, 0.05);
        }
        assert!((dyn_.velocity() - 5.0).abs() < 0.01);
    }

    #[test]
    fn first_step_is_lagged() {
        let mut dyn_ = TruckDynamics::new(quiet_settings(), false);
        dyn_.step(
            &Actuation {
                velocity: 5.0,
                angular: 0.0,
            },
            0.05,
        );
        // v = 5 · dt/τ = 5 · 0.1
        assert!((dyn_.velocity() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn commands_are_clamped_to_limits() {
        let mut dyn_ = TruckDynamics::new(quiet_settings(), false);
        let cmd = Actuation {
            velocity: 1000.0,
            angular: -1000.0,
        };
        for _ in 0..1000 {
            dyn_.step(&cmd, 0.05);
        }
        assert!(dyn_.velocity() <= quiet_settings().max_velocity + 1e-9);
        assert!(dyn_.angular_velocity() >= -quiet_settings().max_angular - 1e-9);
    }

    #[test]
    fn reverse_blocked_unless_allowed() {
        let cmd = Actuation {
            velocity: -3.0,
            angular: 0.0,
        };

        let mut fwd_only = TruckDynamics::new(quiet_settings(), false);
        for _ in 0..100 {
            fwd_only.step(&cmd, 0.05);
        }
        assert!(fwd_only.velocity().abs() < 1e-9);

        let mut reversing = TruckDynamics::new(quiet_settings(), true);
        for _ in 0..100 {
            reversing.step(&cmd, 0.05);
        }
        assert!((reversing.velocity() - -3.0).abs() < 0.01);
    }

    #[test]
    fn position_integrates_along_heading() {
        let mut dyn_ = TruckDynamics::new(quiet_settings(), false);
        dyn_.set_pose(Pose {
            x: 0.0,
            y: 0.0,
            theta: PI / 2.0,
        });
        let cmd = Actuation {
            velocity: 2.0,
            angular: 0.0,
        };
        for _ in 0..200 {
            dyn_.step(&cmd, 0.05);
        }
        let pose = dyn_.pose();
        // Heading +y: x stays put, y grows.
        assert!(pose.x.abs() < 1e-6);
        assert!(pose.y > 10.0);
    }

    #[test]
    fn theta_stays_wrapped() {
        let mut dyn_ = TruckDynamics::new(quiet_settings(), false);
        let cmd = Actuation {
            velocity: 0.0,
            angular: 1.0,
        };
        for _ in 0..2000 {
            dyn_.step(&cmd, 0.05);
            let theta = dyn_.pose().theta;
            assert!(theta > -PI && theta <= PI);
        }
    }

    #[test]
    fn temperature_rises_with_speed() {
        let mut dyn_ = TruckDynamics::new(quiet_settings(), false);
        let base = dyn_.temperature();
        let cmd = Actuation {
            velocity: 10.0,
            angular: 0.0,
        };
        for _ in 0..4000 {
            dyn_.step(&cmd, 0.05);
        }
        assert!(dyn_.temperature() > base + 10.0);
    }

    #[test]
    fn seeded_noise_is_deterministic() {
        let settings = DynamicsSettings {
            noise_seed: Some(42),
            ..DynamicsSettings::default()
        };
        let mut a = TruckDynamics::new(settings, false);
        let mut b = TruckDynamics::new(settings, false);
        for _ in 0..10 {
            assert_eq!(a.observe(0.0), b.observe(0.0));
        }
    }

    #[test]
    fn temperature_hook_overrides() {
        let mut dyn_ = TruckDynamics::new(quiet_settings(), false);
        dyn_.set_temperature(121.0);
        assert_eq!(dyn_.temperature(), 121.0);
    }
}
