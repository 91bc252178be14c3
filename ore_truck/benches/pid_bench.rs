//! PID micro-benchmark.
//!
//! Measures the per-tick cost of the two navigation loops: a plain step,
//! a step inside saturation (anti-windup path), and a bumpless reinit.

use criterion::{Criterion, criterion_group, criterion_main};

use ore_common::config::PidSettings;
use ore_truck::control::pid::Pid;

const DT: f64 = 0.05; // 20 Hz navigation tick

fn bench_step(c: &mut Criterion) {
    let mut pid = Pid::new(&PidSettings::linear_default());
    let mut cycle = 0u64;

    c.bench_function("pid_step", |b| {
        b.iter(|| {
            cycle += 1;
            let t = cycle as f64 * DT;
            let setpoint = 5.0 * t.sin();
            let measurement = setpoint * 0.95;
            pid.step(setpoint, measurement, DT)
        });
    });
}

fn bench_step_saturated(c: &mut Criterion) {
    let mut pid = Pid::new(&PidSettings::angular_default());

    c.bench_function("pid_step_saturated", |b| {
        b.iter(|| pid.step(100.0, 0.0, DT));
    });
}

fn bench_reinit(c: &mut Criterion) {
    let mut pid = Pid::new(&PidSettings::linear_default());

    c.bench_function("pid_reinit", |b| {
        b.iter(|| {
            pid.reinit(3.0, 3.0, 2.9, DT);
            pid.step(3.0, 2.9, DT)
        });
    });
}

criterion_group!(benches, bench_step, bench_step_saturated, bench_reinit);
criterion_main!(benches);
