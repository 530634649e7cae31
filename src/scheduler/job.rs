use super::schedule::Schedule;
use chrono::{DateTime, Local, TimeZone};

/// Work a job triggers when it comes due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobAction {
    /// Restart the recorder at this index in camera order
    Cycle { camera: usize },
    /// Log the state of every recorder
    Heartbeat,
}

#[derive(Debug, Clone)]
pub struct ScheduledJob<Tz: TimeZone = Local> {
    name: String,
    schedule: Schedule,
    action: JobAction,
    next_run: DateTime<Tz>,
    runs: u64,
}

impl<Tz: TimeZone> ScheduledJob<Tz> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn action(&self) -> JobAction {
        self.action
    }

    pub fn next_run(&self) -> &DateTime<Tz> {
        &self.next_run
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }
}

/// Recurring jobs evaluated once per tick
#[derive(Debug, Clone)]
pub struct JobScheduler<Tz: TimeZone = Local> {
    jobs: Vec<ScheduledJob<Tz>>,
}

impl<Tz: TimeZone> Default for JobScheduler<Tz> {
    fn default() -> Self {
        Self { jobs: Vec::new() }
    }
}

impl<Tz: TimeZone> JobScheduler<Tz> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job; its first run is the schedule's next slot after `now`
    pub fn add<S: Into<String>>(
        &mut self,
        name: S,
        schedule: Schedule,
        action: JobAction,
        now: &DateTime<Tz>,
    ) {
        let next_run = schedule.next_after(now);
        self.jobs.push(ScheduledJob {
            name: name.into(),
            schedule,
            action,
            next_run,
            runs: 0,
        });
    }

    /// Collect every due job in registration order and reschedule it.
    ///
    /// The next run is computed from `now`, so a job fires once no matter
    /// how many of its slots were missed.
    pub fn take_due(&mut self, now: &DateTime<Tz>) -> Vec<JobAction> {
        let mut due = Vec::new();
        for job in self.jobs.iter_mut().filter(|job| job.next_run <= *now) {
            job.runs += 1;
            job.next_run = job.schedule.next_after(now);
            due.push(job.action);
        }
        due
    }

    pub fn jobs(&self) -> &[ScheduledJob<Tz>] {
        &self.jobs
    }

    /// Earliest upcoming run across all jobs
    pub fn next_run(&self) -> Option<&DateTime<Tz>> {
        self.jobs.iter().map(|job| &job.next_run).min()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
