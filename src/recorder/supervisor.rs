use super::command::RecorderCommand;
use super::process::{ProcessExit, ProcessLauncher, RecorderProcess};
use crate::camera::CameraSpec;
use crate::error::{JscrError, Result};
use crate::recovery::{RecoveryAction, RecoveryConfig, RestartTracker};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Observed recorder state, recomputed from the OS on every query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    NotStarted,
    Running,
    Exited,
}

/// Result of an [`ensure`](RecorderSupervisor::ensure) pass
#[derive(Debug, Clone, PartialEq)]
pub enum EnsureOutcome {
    AlreadyRecording,
    Started,
    /// Not recording, but the restart policy is still backing off
    Deferred(Duration),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecorderStats {
    pub spawns: u64,
    pub spawn_failures: u64,
    pub cycles: u64,
    pub exits: u64,
}

/// Point-in-time view of one recorder for heartbeats and the status file
#[derive(Debug, Clone, Serialize)]
pub struct RecorderStatus {
    pub camera: String,
    pub state: RecorderState,
    pub pid: Option<u32>,
    pub uptime_seconds: Option<u64>,
    pub consecutive_failures: u32,
    pub stats: RecorderStats,
}

struct ActiveProcess {
    handle: Box<dyn RecorderProcess>,
    started_at: Instant,
    exit_reported: bool,
    stop_requested: bool,
}

/// Owns the recorder process of a single camera
pub struct RecorderSupervisor {
    camera: CameraSpec,
    command: RecorderCommand,
    launcher: Arc<dyn ProcessLauncher>,
    process: Option<ActiveProcess>,
    restart: RestartTracker,
    cycle_exit_timeout: Duration,
    stats: RecorderStats,
}

impl RecorderSupervisor {
    pub fn new(
        camera: CameraSpec,
        command: RecorderCommand,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        Self {
            camera,
            command,
            launcher,
            process: None,
            restart: RestartTracker::new(RecoveryConfig::default()),
            cycle_exit_timeout: Duration::ZERO,
            stats: RecorderStats::default(),
        }
    }

    pub fn with_recovery(mut self, config: RecoveryConfig) -> Self {
        self.restart = RestartTracker::new(config);
        self
    }

    /// Wait up to `timeout` for the old recorder to exit during a cycle
    pub fn with_cycle_exit_timeout(mut self, timeout: Duration) -> Self {
        self.cycle_exit_timeout = timeout;
        self
    }

    pub fn camera(&self) -> &CameraSpec {
        &self.camera
    }

    pub fn name(&self) -> &str {
        self.camera.name()
    }

    pub fn stats(&self) -> &RecorderStats {
        &self.stats
    }

    /// Pid of the current handle, which may belong to an exited process
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(|active| active.handle.id())
    }

    pub fn state(&mut self) -> RecorderState {
        let poll = match self.process.as_mut() {
            None => return RecorderState::NotStarted,
            Some(active) => active.handle.try_wait(),
        };

        match poll {
            Ok(None) => RecorderState::Running,
            Ok(Some(exit)) => {
                self.report_exit(exit);
                RecorderState::Exited
            }
            // Unknown, so never spawn a second recorder over it
            Err(e) => {
                warn!(
                    camera = %self.camera.name(),
                    "Failed to poll recorder, assuming it is still running: {}", e
                );
                RecorderState::Running
            }
        }
    }

    pub fn is_recording(&mut self) -> bool {
        self.state() == RecorderState::Running
    }

    /// Spawn a new recorder, replacing the current handle unconditionally
    pub fn start(&mut self) -> Result<()> {
        let invocation = self.command.invocation(&self.camera);
        info!(camera = %self.camera.name(), "Starting recording");
        debug!(
            camera = %self.camera.name(),
            "=> {}",
            invocation.redacted_command_line(&self.camera.settings().password)
        );

        match self.launcher.launch(&invocation) {
            Ok(handle) => {
                self.stats.spawns += 1;
                info!(
                    camera = %self.camera.name(),
                    "Recorder running with pid {}",
                    handle.id().map_or_else(|| "?".to_string(), |pid| pid.to_string())
                );
                self.process = Some(ActiveProcess {
                    handle,
                    started_at: Instant::now(),
                    exit_reported: false,
                    stop_requested: false,
                });
                Ok(())
            }
            Err(source) => {
                self.stats.spawn_failures += 1;
                let delay = self.restart.record_failure(Instant::now());
                debug!(
                    camera = %self.camera.name(),
                    "Next start attempt in {:?}", delay
                );
                Err(JscrError::Spawn {
                    camera: self.camera.name().to_string(),
                    source,
                })
            }
        }
    }

    /// Send SIGINT to a running recorder without waiting for it
    pub fn stop(&mut self) -> Result<()> {
        if !self.is_recording() {
            debug!(camera = %self.camera.name(), "Not recording, nothing to stop");
            return Ok(());
        }

        info!(camera = %self.camera.name(), "Stopping recording");
        match self.process.as_mut() {
            Some(active) => {
                active.handle.interrupt()?;
                active.stop_requested = true;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Start the recorder unless it is already running
    pub fn ensure(&mut self) -> Result<EnsureOutcome> {
        match self.state() {
            RecorderState::Running => return Ok(EnsureOutcome::AlreadyRecording),
            RecorderState::NotStarted => {
                debug!(camera = %self.camera.name(), "Recorder not created yet");
            }
            RecorderState::Exited => {
                debug!(camera = %self.camera.name(), "Recorder is not recording");
            }
        }

        match self.restart.next_action(Instant::now()) {
            RecoveryAction::RetryAfterDelay(remaining) => {
                debug!(
                    camera = %self.camera.name(),
                    "Backing off, {:?} until next attempt", remaining
                );
                Ok(EnsureOutcome::Deferred(remaining))
            }
            RecoveryAction::Start => {
                self.start()?;
                Ok(EnsureOutcome::Started)
            }
        }
    }

    /// Stop (if running) and start again so the recorder opens a new file.
    ///
    /// Without an exit timeout the old recorder may still be flushing when
    /// the new one starts, so both can briefly write at once.
    pub async fn cycle(&mut self) -> Result<()> {
        info!(camera = %self.camera.name(), "Cycling recording");
        self.stats.cycles += 1;

        if self.is_recording() {
            if let Err(e) = self.stop() {
                error!(camera = %self.camera.name(), "Failed to stop recorder: {}", e);
            } else if !self.cycle_exit_timeout.is_zero() {
                self.wait_for_exit(self.cycle_exit_timeout).await;
            }
        }

        self.start()
    }

    async fn wait_for_exit(&mut self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        let poll = Duration::from_millis(100).min(timeout);

        while self.is_recording() {
            if Instant::now() >= deadline {
                warn!(
                    camera = %self.camera.name(),
                    "Recorder still running after {:?}, starting replacement anyway", timeout
                );
                return;
            }
            tokio::time::sleep(poll).await;
        }
        debug!(camera = %self.camera.name(), "Previous recorder exited");
    }

    pub fn status(&mut self) -> RecorderStatus {
        let state = self.state();
        let uptime_seconds = match (&self.process, state) {
            (Some(active), RecorderState::Running) => Some(active.started_at.elapsed().as_secs()),
            _ => None,
        };

        RecorderStatus {
            camera: self.camera.name().to_string(),
            state,
            pid: self.pid(),
            uptime_seconds,
            consecutive_failures: self.restart.consecutive_failures(),
            stats: self.stats.clone(),
        }
    }

    /// Log an exit and feed it to the restart policy once per process
    fn report_exit(&mut self, exit: ProcessExit) {
        let Some(active) = self.process.as_mut() else {
            return;
        };
        if active.exit_reported {
            return;
        }
        active.exit_reported = true;

        let uptime = active.started_at.elapsed();
        self.stats.exits += 1;

        if exit.success() {
            info!(
                camera = %self.camera.name(),
                "Recorder exited ({}) after {:?}", exit, uptime
            );
        } else {
            warn!(
                camera = %self.camera.name(),
                "Recorder exited ({}) after {:?}", exit, uptime
            );
        }

        // Exits after our own stop are not failures
        if active.stop_requested {
            return;
        }

        if let Some(delay) = self.restart.record_exit(uptime, Instant::now()) {
            if delay.is_zero() {
                return;
            }
            warn!(
                camera = %self.camera.name(),
                "Recorder died within {:?} of starting, delaying restart by {:?}",
                uptime,
                delay
            );
        }
    }
}
