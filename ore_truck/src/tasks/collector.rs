//! Data collector task (1 Hz).
//!
//! Appends one CSV row per tick to `truck_{id}.csv` in the configured
//! directory. A missing or failing sink never stops the truck: open/write
//! errors are recorded in `last_event` and the task keeps running with
//! in-memory state only.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::Writer;
use tracing::{info, warn};

use crate::store::StateStore;
use crate::unix_now;

const HEADER: [&str; 12] = [
    "timestamp",
    "truck_id",
    "status",
    "mode",
    "position_x",
    "position_y",
    "theta",
    "velocity",
    "temperature",
    "electrical_fault",
    "hydraulic_fault",
    "event_description",
];

pub struct CollectorTask {
    store: Arc<StateStore>,
    writer: Option<Writer<File>>,
    path: PathBuf,
}

impl CollectorTask {
    pub fn new(store: Arc<StateStore>, directory: &Path, truck_id: u32) -> Self {
        let path = directory.join(format!("truck_{truck_id}.csv"));
        let writer = match Self::open(&path) {
            Ok(w) => {
                info!(path = %path.display(), "telemetry sink ready");
                Some(w)
            }
            Err(e) => {
                warn!(path = %path.display(), "telemetry sink unavailable: {e}");
                store.record_event(format!("telemetry sink unavailable: {e}"));
                None
            }
        };
        Self {
            store,
            writer,
            path,
        }
    }

    fn open(path: &Path) -> std::io::Result<Writer<File>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = Writer::from_path(path)?;
        writer.write_record(HEADER)?;
        writer.flush()?;
        Ok(writer)
    }

    pub fn tick(&mut self) {
        let snap = self.store.snapshot();
        let Some(writer) = self.writer.as_mut() else {
            return;
        };

        let row = [
            format!("{:.3}", unix_now()),
            snap.truck_id.to_string(),
            snap.status.as_str().to_string(),
            snap.mode.as_str().to_string(),
            format!("{:.3}", snap.pose.x),
            format!("{:.3}", snap.pose.y),
            format!("{:.4}", snap.pose.theta),
            format!("{:.3}", snap.velocity),
            format!("{:.3}", snap.temperature),
            snap.faults.electrical.to_string(),
            snap.faults.hydraulic.to_string(),
            snap.last_event.clone(),
        ];

        if let Err(e) = Self::append(writer, &row) {
            warn!(path = %self.path.display(), "telemetry write failed: {e}");
            self.store.record_event(format!("telemetry write failed: {e}"));
            self.writer = None;
        }
    }

    fn append(writer: &mut Writer<File>, row: &[String; 12]) -> csv::Result<()> {
        writer.write_record(row)?;
        writer.flush()?;
        Ok(())
    }

    /// Sink path (diagnostics and tests).
    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
