use chrono::{
    DateTime, Duration as ChronoDuration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Timelike,
};
use std::fmt;
use std::time::Duration;

/// When a recurring job becomes due
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed interval measured from the previous run
    Every(Duration),
    /// Once an hour at `hh:minute:00` wall-clock time
    Hourly { minute: u32 },
    /// Once a day at a local time of day
    Daily { at: NaiveTime },
}

impl Schedule {
    /// First due time strictly after `now`
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        match self {
            Schedule::Every(interval) => {
                let step = ChronoDuration::from_std(*interval)
                    .unwrap_or_else(|_| ChronoDuration::days(365));
                now.clone() + step
            }
            Schedule::Hourly { minute } => {
                let local = now.naive_local();
                let candidate = local
                    .date()
                    .and_hms_opt(local.hour(), (*minute).min(59), 0)
                    .unwrap_or(local);
                resolve_after(now, candidate, ChronoDuration::hours(1))
            }
            Schedule::Daily { at } => {
                let candidate = now.naive_local().date().and_time(*at);
                resolve_after(now, candidate, ChronoDuration::days(1))
            }
        }
    }
}

/// Walk `candidate` forward by `step` until it maps to an instant after `now`
fn resolve_after<Tz: TimeZone>(
    now: &DateTime<Tz>,
    mut candidate: NaiveDateTime,
    step: ChronoDuration,
) -> DateTime<Tz> {
    let tz = now.timezone();
    loop {
        let resolved = match tz.from_local_datetime(&candidate) {
            LocalResult::Single(at) => Some(at),
            // Repeated wall-clock hour: prefer the earlier instant if still ahead
            LocalResult::Ambiguous(earlier, later) => {
                if earlier > *now {
                    Some(earlier)
                } else {
                    Some(later)
                }
            }
            // Skipped by a DST jump
            LocalResult::None => tz
                .from_local_datetime(&(candidate + ChronoDuration::hours(1)))
                .earliest(),
        };

        match resolved {
            Some(at) if at > *now => return at,
            _ => candidate += step,
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Every(interval) => write!(f, "every {}s", interval.as_secs()),
            Schedule::Hourly { minute } => write!(f, "hourly at :{:02}", minute),
            Schedule::Daily { at } => write!(f, "daily at {}", at.format("%H:%M:%S")),
        }
    }
}
