//! Fault monitor task (2 Hz).
//!
//! Thermal supervision plus stochastic electrical/hydraulic fault
//! injection. A critical temperature or a newly latched fault flag maps to
//! an EMERGENCY command on the queue (never a crash) and a signal on the
//! fault event so the command logic wakes immediately. Latched flags
//! persist until RESET.

use std::sync::Arc;

use ore_common::command::Command;
use ore_common::config::FaultSettings;
use ore_common::state::TruckStatus;
use rand::Rng;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::warn;

use crate::events::{EventHub, TruckEvent};
use crate::queue::CommandQueue;
use crate::store::StateStore;
use crate::tasks::enqueue_command;

pub struct FaultMonitorTask {
    store: Arc<StateStore>,
    commands: Arc<CommandQueue>,
    events: Arc<EventHub>,
    settings: FaultSettings,
    rng: SmallRng,
    /// Edge detector for the thermal warning band.
    warned: bool,
}

impl FaultMonitorTask {
    pub fn new(
        store: Arc<StateStore>,
        commands: Arc<CommandQueue>,
        events: Arc<EventHub>,
        settings: FaultSettings,
    ) -> Self {
        let rng = match settings.fault_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Self {
            store,
            commands,
            events,
            settings,
            rng,
            warned: false,
        }
    }

    pub fn tick(&mut self) {
        let snap = self.store.snapshot();

        // Thermal checks.
        if snap.temperature >= self.settings.temp_crit {
            if snap.status != TruckStatus::Emergency {
                warn!(temperature = snap.temperature, "critical engine temperature");
                self.store.record_event(format!(
                    "critical temperature {:.1} C - emergency stop",
                    snap.temperature
                ));
                enqueue_command(&self.commands, &self.store, Command::Emergency);
                self.events.signal(TruckEvent::Fault);
            }
        } else if snap.temperature >= self.settings.temp_warn {
            if !self.warned {
                self.warned = true;
                warn!(temperature = snap.temperature, "engine temperature high");
                self.store.record_event(format!(
                    "temperature warning {:.1} C",
                    snap.temperature
                ));
            }
        } else {
            self.warned = false;
        }

        // Stochastic faults: independent draws, latched once set.
        let p = self.settings.fault_probability;
        let new_electrical = !snap.faults.electrical && self.rng.random_bool(p);
        let new_hydraulic = !snap.faults.hydraulic && self.rng.random_bool(p);

        if new_electrical || new_hydraulic {
            let cause = if new_electrical && new_hydraulic {
                "electrical and hydraulic faults detected"
            } else if new_electrical {
                "electrical fault detected"
            } else {
                "hydraulic fault detected"
            };
            warn!("{cause}");
            self.store.update(|s| {
                s.faults.electrical |= new_electrical;
                s.faults.hydraulic |= new_hydraulic;
                s.last_event = cause.to_string();
            });
            enqueue_command(&self.commands, &self.store, Command::Emergency);
            self.events.signal(TruckEvent::Fault);
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn task(settings: FaultSettings) -> FaultMonitorTask {
        FaultMonitorTask::new(
            Arc::new(StateStore::new(1, 80.0)),
            Arc::new(CommandQueue::new(8)),
            Arc::new(EventHub::new()),
            settings,
        )
    }

    fn quiet() -> FaultSettings {
        FaultSettings {
            fault_probability: 0.0,
            fault_seed: Some(1),
            ..FaultSettings::default()
        }
    }

    #[test]
    fn nominal_temperature_is_silent() {
        let mut monitor = task(quiet());
        monitor.tick();
        assert!(monitor.commands.is_empty());
        assert!(monitor.store.snapshot().last_event.is_empty());
    }

    #[test]
    fn critical_temperature_raises_emergency() {
        let mut monitor = task(quiet());
        monitor.store.update(|s| s.temperature = 121.0);
        let fault_gen = monitor.events.generation(TruckEvent::Fault);

        monitor.tick();

        assert_eq!(monitor.commands.pop(), Some(Command::Emergency));
        assert!(
            monitor
                .store
                .snapshot()
                .last_event
                .contains("critical temperature")
        );
        assert!(monitor.events.generation(TruckEvent::Fault) > fault_gen);
    }

    #[test]
    fn no_reinjection_while_emergency_latched() {
        let mut monitor = task(quiet());
        monitor.store.update(|s| {
            s.temperature = 130.0;
            s.status = TruckStatus::Emergency;
        });
        monitor.tick();
        assert!(monitor.commands.is_empty());
    }

    #[test]
    fn warning_band_is_edge_triggered() {
        let mut monitor = task(quiet());
        monitor.store.update(|s| s.temperature = 100.0);
        monitor.tick();
        assert!(monitor.store.snapshot().last_event.contains("warning"));

        // Second tick in the band: no new event.
        monitor.store.record_event("");
        monitor.tick();
        assert!(monitor.store.snapshot().last_event.is_empty());

        // Cool down, then heat up again: warning re-arms.
        monitor.store.update(|s| s.temperature = 80.0);
        monitor.tick();
        monitor.store.update(|s| s.temperature = 101.0);
        monitor.tick();
        assert!(monitor.store.snapshot().last_event.contains("warning"));
        // Warning never queues an emergency.
        assert!(monitor.commands.is_empty());
    }

    #[test]
    fn certain_fault_probability_latches_flags() {
        let settings = FaultSettings {
            fault_probability: 1.0,
            fault_seed: Some(9),
            ..FaultSettings::default()
        };
        let mut monitor = task(settings);
        monitor.tick();

        let snap = monitor.store.snapshot();
        assert!(snap.faults.electrical && snap.faults.hydraulic);
        assert_eq!(monitor.commands.pop(), Some(Command::Emergency));

        // Already latched: no second emergency.
        monitor.tick();
        assert!(monitor.commands.is_empty());
    }

    #[test]
    fn zero_probability_never_faults() {
        let mut monitor = task(quiet());
        for _ in 0..1000 {
            monitor.tick();
        }
        assert!(!monitor.store.snapshot().faults.any());
    }
}
