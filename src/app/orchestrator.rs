use super::types::TickReport;
use crate::config::JscrConfig;
use crate::recorder::{
    EnsureOutcome, ProcessLauncher, RecorderCommand, RecorderSupervisor, SystemLauncher,
};
use crate::recovery::RecoveryConfig;
use crate::scheduler::{JobAction, JobScheduler, Schedule};
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Polling period of the supervision loop
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Drives every recorder supervisor from a single tick loop
pub struct JscrOrchestrator {
    pub(super) config: JscrConfig,
    pub(super) supervisors: Vec<RecorderSupervisor>,
    pub(super) scheduler: JobScheduler<Local>,
    pub(super) tick_interval: Duration,
    pub(super) started_at: Instant,
    pub(super) ticks: u64,
    pub(super) cancellation_token: CancellationToken,
}

impl JscrOrchestrator {
    /// Create an orchestrator that launches real recorder processes
    pub fn new(config: JscrConfig) -> Self {
        Self::with_launcher(config, Arc::new(SystemLauncher))
    }

    pub fn with_launcher(config: JscrConfig, launcher: Arc<dyn ProcessLauncher>) -> Self {
        let command = RecorderCommand::from_config(&config);
        let recovery = RecoveryConfig::from(&config.restart);
        let cycle_exit_timeout = Duration::from_millis(config.restart.cycle_exit_timeout_ms);

        let supervisors = config
            .cameras
            .iter()
            .map(|camera| {
                RecorderSupervisor::new(camera.clone(), command.clone(), Arc::clone(&launcher))
                    .with_recovery(recovery.clone())
                    .with_cycle_exit_timeout(cycle_exit_timeout)
            })
            .collect();

        let scheduler = Self::build_scheduler(&config, &Local::now());

        Self {
            config,
            supervisors,
            scheduler,
            tick_interval: TICK_INTERVAL,
            started_at: Instant::now(),
            ticks: 0,
            cancellation_token: CancellationToken::new(),
        }
    }

    fn build_scheduler(config: &JscrConfig, now: &DateTime<Local>) -> JobScheduler<Local> {
        let mut scheduler = JobScheduler::new();

        for (index, camera) in config.cameras.iter().enumerate() {
            if config.schedule.cycle_enabled {
                scheduler.add(
                    format!("cycle:{}", camera.name()),
                    Schedule::Hourly {
                        minute: config.schedule.cycle_minute,
                    },
                    JobAction::Cycle { camera: index },
                    now,
                );
            }
            if let Some(at) = config.schedule.daily_cycle_at {
                scheduler.add(
                    format!("daily-cycle:{}", camera.name()),
                    Schedule::Daily { at },
                    JobAction::Cycle { camera: index },
                    now,
                );
            }
        }

        scheduler.add(
            "heartbeat",
            Schedule::Every(Duration::from_secs(
                config.schedule.heartbeat_interval_seconds,
            )),
            JobAction::Heartbeat,
            now,
        );

        for job in scheduler.jobs() {
            info!(
                "Scheduled {} ({}), first run at {}",
                job.name(),
                job.schedule(),
                job.next_run().format("%Y-%m-%d %H:%M:%S")
            );
        }

        scheduler
    }

    /// Override the loop period
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn config(&self) -> &JscrConfig {
        &self.config
    }

    pub fn supervisors(&self) -> &[RecorderSupervisor] {
        &self.supervisors
    }

    pub fn supervisor_mut(&mut self, camera: &str) -> Option<&mut RecorderSupervisor> {
        self.supervisors
            .iter_mut()
            .find(|supervisor| supervisor.name() == camera)
    }

    pub fn scheduler(&self) -> &JobScheduler<Local> {
        &self.scheduler
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Token that ends [`run`](Self::run) when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// One loop iteration at the current wall-clock time
    pub async fn tick(&mut self) -> TickReport {
        self.tick_at(Local::now()).await
    }

    /// Run due jobs, then ensure every recorder, as of `now`
    pub async fn tick_at(&mut self, now: DateTime<Local>) -> TickReport {
        self.ticks += 1;
        let jobs_run = self.run_due_jobs(&now).await;
        let mut report = self.ensure_all();
        report.jobs_run = jobs_run;
        report
    }

    /// Execute due jobs in order. A camera is cycled at most once per tick.
    pub async fn run_due_jobs(&mut self, now: &DateTime<Local>) -> Vec<JobAction> {
        let due = self.scheduler.take_due(now);
        let mut cycled = HashSet::new();

        for action in &due {
            match *action {
                JobAction::Cycle { camera } => {
                    if !cycled.insert(camera) {
                        debug!("Camera #{} already cycled this tick", camera);
                        continue;
                    }
                    if let Some(supervisor) = self.supervisors.get_mut(camera) {
                        if let Err(e) = supervisor.cycle().await {
                            error!(camera = %supervisor.name(), "Cycle failed: {}", e);
                        }
                    }
                }
                JobAction::Heartbeat => self.heartbeat(),
            }
        }

        due
    }

    /// Start every recorder that is not running, in camera order
    pub fn ensure_all(&mut self) -> TickReport {
        let mut report = TickReport::default();

        for supervisor in &mut self.supervisors {
            match supervisor.ensure() {
                Ok(EnsureOutcome::AlreadyRecording) => {}
                Ok(EnsureOutcome::Started) => report.started += 1,
                Ok(EnsureOutcome::Deferred(_)) => report.deferred += 1,
                Err(e) => {
                    error!(camera = %supervisor.name(), "{}", e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}
