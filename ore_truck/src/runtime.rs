//! Startup and shutdown orchestration.
//!
//! Builds the shared substrate, spawns one named thread per task and
//! tears everything down again: on stop the shutdown flag is raised, the
//! shutdown event broadcast, the broker connection closed, and every
//! thread joined with a bounded timeout — stragglers are logged and
//! abandoned rather than blocking the exit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use ore_common::config::TruckConfig;
use tracing::{debug, info, warn};

use crate::TruckError;
use crate::control::dynamics::TruckDynamics;
use crate::events::TruckEvent;
use crate::mqtt::MqttAdapter;
use crate::tasks::{TaskContext, Ticker};
use crate::tasks::collector::CollectorTask;
use crate::tasks::fault::FaultMonitorTask;
use crate::tasks::logic::LogicTask;
use crate::tasks::navigation::NavigationTask;
use crate::tasks::route::RoutePlannerTask;
use crate::tasks::sensors::SensorTask;
use crate::tasks::simulator::SimulatorTask;

/// How long `stop()` waits for each task before abandoning it.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Running truck controller: one thread per task.
pub struct TruckRuntime {
    ctx: TaskContext,
    handles: Vec<(&'static str, JoinHandle<()>)>,
    mqtt: Option<MqttAdapter>,
}

impl TruckRuntime {
    /// Validate the configuration and spawn every task.
    pub fn start(
        config: TruckConfig,
        truck_id: u32,
        mqtt_enabled: bool,
    ) -> Result<Self, TruckError> {
        config.validate()?;
        let ctx = TaskContext::new(config, truck_id);
        let config = Arc::clone(&ctx.config);
        let periods = config.periods;

        info!(truck_id, mqtt = mqtt_enabled, "truck controller starting");

        let mut handles = Vec::new();

        // Mine simulator (closes the loop in place of hardware).
        {
            let mut task = SimulatorTask::new(
                TruckDynamics::new(config.dynamics, config.allow_reverse),
                Arc::clone(&ctx.actuation),
                Arc::clone(&ctx.raw_feed),
                periods.sim().as_secs_f64(),
            );
            handles.push(spawn_periodic("sim", periods.sim(), &ctx.shutdown, move || {
                task.tick();
            })?);
        }

        // Sensor filtering.
        {
            let mut task = SensorTask::new(
                Arc::clone(&ctx.raw_feed),
                Arc::clone(&ctx.store),
                Arc::clone(&ctx.ring),
                config.filter_window,
            );
            handles.push(spawn_periodic(
                "sensors",
                periods.sensor(),
                &ctx.shutdown,
                move || task.tick(),
            )?);
        }

        // Command logic: periodic, woken early by the fault event.
        {
            let mut task = LogicTask::new(
                Arc::clone(&ctx.store),
                Arc::clone(&ctx.commands),
                Arc::clone(&ctx.events),
                config.fault.temp_crit,
            );
            let events = Arc::clone(&ctx.events);
            let shutdown = Arc::clone(&ctx.shutdown);
            let period = periods.logic();
            let handle = std::thread::Builder::new()
                .name("logic".to_string())
                .spawn(move || {
                    let mut ticker = Ticker::new(period);
                    let mut seen = events.generation(TruckEvent::Fault);
                    while !shutdown.load(Ordering::Relaxed) {
                        task.tick();
                        let observed =
                            events.wait_deadline(TruckEvent::Fault, seen, ticker.next_deadline());
                        if observed == seen {
                            // Plain period boundary.
                            ticker.advance();
                        }
                        seen = observed;
                    }
                    debug!(ticks = ticker.ticks, overruns = ticker.overruns, "logic stopped");
                })
                .map_err(|e| TruckError::Spawn("logic", e.to_string()))?;
            handles.push(("logic", handle));
        }

        // Navigation control.
        {
            let mut task = NavigationTask::new(
                Arc::clone(&ctx.store),
                Arc::clone(&ctx.actuation),
                Arc::clone(&ctx.events),
                &config,
            );
            handles.push(spawn_periodic("nav", periods.nav(), &ctx.shutdown, move || {
                task.tick();
            })?);
        }

        // Route planner.
        {
            let mut task = RoutePlannerTask::new(Arc::clone(&ctx.store), &config);
            handles.push(spawn_periodic(
                "route",
                periods.route(),
                &ctx.shutdown,
                move || task.tick(),
            )?);
        }

        // Fault monitor.
        {
            let mut task = FaultMonitorTask::new(
                Arc::clone(&ctx.store),
                Arc::clone(&ctx.commands),
                Arc::clone(&ctx.events),
                config.fault,
            );
            handles.push(spawn_periodic(
                "fault",
                periods.fault(),
                &ctx.shutdown,
                move || task.tick(),
            )?);
        }

        // Data collector.
        {
            let mut task = CollectorTask::new(
                Arc::clone(&ctx.store),
                &config.telemetry.directory,
                truck_id,
            );
            handles.push(spawn_periodic("log", periods.log(), &ctx.shutdown, move || {
                task.tick();
            })?);
        }

        // Messaging adapter, when enabled. Without it the truck runs all
        // tasks but emits no network traffic.
        let mqtt = if mqtt_enabled {
            Some(MqttAdapter::spawn(&ctx, truck_id).map_err(|e| {
                TruckError::Spawn("mqtt", e.to_string())
            })?)
        } else {
            None
        };

        Ok(Self { ctx, handles, mqtt })
    }

    /// Shared substrate (scenario tests and the signal handler).
    pub fn context(&self) -> &TaskContext {
        &self.ctx
    }

    /// Raise the shutdown flag and wake every waiter.
    pub fn request_shutdown(&self) {
        self.ctx.shutdown.store(true, Ordering::Relaxed);
        self.ctx.events.broadcast(TruckEvent::Shutdown);
    }

    /// Block until a shutdown is requested (flag observed via the
    /// shutdown event, re-checked at least once per second).
    pub fn wait_for_shutdown(&self) {
        let mut seen = self.ctx.events.generation(TruckEvent::Shutdown);
        while !self.ctx.shutdown.load(Ordering::Relaxed) {
            seen = self
                .ctx
                .events
                .wait_newer(TruckEvent::Shutdown, seen, Duration::from_secs(1));
        }
    }

    /// Stop every task and join with a bounded timeout.
    pub fn stop(mut self) {
        self.request_shutdown();
        if let Some(adapter) = self.mqtt.take() {
            adapter.disconnect();
            self.handles.extend(adapter.into_handles());
        }

        let deadline = Instant::now() + JOIN_TIMEOUT;
        for (name, handle) in self.handles.drain(..) {
            while !handle.is_finished() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
                debug!(task = name, "task joined");
            } else {
                // Abandoned: the thread is detached when the handle drops.
                warn!(task = name, "task did not stop in time, abandoning");
            }
        }
        info!("truck controller stopped");
    }
}

fn spawn_periodic(
    name: &'static str,
    period: Duration,
    shutdown: &Arc<AtomicBool>,
    mut tick: impl FnMut() + Send + 'static,
) -> Result<(&'static str, JoinHandle<()>), TruckError> {
    let shutdown = Arc::clone(shutdown);
    let handle = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let mut ticker = Ticker::new(period);
            while !shutdown.load(Ordering::Relaxed) {
                tick();
                ticker.wait();
            }
            debug!(task = name, ticks = ticker.ticks, overruns = ticker.overruns, "task stopped");
        })
        .map_err(|e| TruckError::Spawn(name, e.to_string()))?;
    Ok((name, handle))
}

// ─── Tests ──────────────────────────────────────────────────────────
