use crate::recorder::RecorderStatus;
use crate::scheduler::JobAction;
use chrono::{DateTime, Local};
use serde::Serialize;

/// Why the supervision loop stopped
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    Signal(String),
    UserRequest,
}

/// What a single tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub jobs_run: Vec<JobAction>,
    pub started: usize,
    pub deferred: usize,
    pub failed: usize,
}

/// Snapshot written to the status file on every heartbeat
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub generated_at: DateTime<Local>,
    pub uptime_seconds: u64,
    pub ticks: u64,
    pub recording: usize,
    pub recorders: Vec<RecorderStatus>,
}
