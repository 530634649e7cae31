use super::types::StatusReport;
use super::JscrOrchestrator;
use crate::error::Result;
use crate::recorder::RecorderState;
use chrono::Local;
use std::path::Path;
use tracing::{info, warn};

impl JscrOrchestrator {
    /// Collect the state of every recorder
    pub fn status_report(&mut self) -> StatusReport {
        let recorders: Vec<_> = self
            .supervisors
            .iter_mut()
            .map(|supervisor| supervisor.status())
            .collect();
        let recording = recorders
            .iter()
            .filter(|status| status.state == RecorderState::Running)
            .count();

        StatusReport {
            generated_at: Local::now(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            ticks: self.ticks,
            recording,
            recorders,
        }
    }

    /// Periodic status line per camera, plus the optional status file
    pub fn heartbeat(&mut self) {
        let report = self.status_report();

        info!(
            "Heartbeat: {}/{} recorders running, up {}s",
            report.recording,
            report.recorders.len(),
            report.uptime_seconds
        );
        for status in &report.recorders {
            info!(
                camera = %status.camera,
                "state={:?} pid={} uptime={}s spawns={} failures={} cycles={}",
                status.state,
                status.pid.map_or_else(|| "-".to_string(), |pid| pid.to_string()),
                status.uptime_seconds.unwrap_or(0),
                status.stats.spawns,
                status.stats.spawn_failures,
                status.stats.cycles
            );
        }

        if let Some(path) = self.config.main.status_file.clone() {
            if let Err(e) = write_status_file(&path, &report) {
                warn!("Failed to write status file {}: {}", path.display(), e);
            }
        }
    }
}

/// Written next to the target, then renamed over it
fn write_status_file(path: &Path, report: &StatusReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
