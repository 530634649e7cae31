mod job;
mod schedule;

#[cfg(test)]
mod tests;

pub use job::{JobAction, JobScheduler, ScheduledJob};
pub use schedule::Schedule;
