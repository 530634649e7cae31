use super::*;
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use std::time::Duration;

fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 17, h, m, s).unwrap()
}

#[test]
fn test_hourly_next_slot_is_strictly_after_now() {
    let hourly = Schedule::Hourly { minute: 0 };

    assert_eq!(hourly.next_after(&at(10, 15, 0)), at(11, 0, 0));
    assert_eq!(hourly.next_after(&at(10, 0, 0)), at(11, 0, 0));
    assert_eq!(hourly.next_after(&at(10, 59, 59)), at(11, 0, 0));
}

#[test]
fn test_hourly_with_minute_offset() {
    let hourly = Schedule::Hourly { minute: 30 };

    assert_eq!(hourly.next_after(&at(10, 15, 0)), at(10, 30, 0));
    assert_eq!(hourly.next_after(&at(10, 45, 0)), at(11, 30, 0));
}

#[test]
fn test_hourly_rolls_over_midnight() {
    let hourly = Schedule::Hourly { minute: 0 };
    assert_eq!(
        hourly.next_after(&at(23, 20, 0)),
        Utc.with_ymd_and_hms(2024, 5, 18, 0, 0, 0).unwrap()
    );
}

#[test]
fn test_daily_schedule() {
    let daily = Schedule::Daily {
        at: NaiveTime::from_hms_opt(3, 0, 0).unwrap(),
    };

    assert_eq!(daily.next_after(&at(1, 0, 0)), at(3, 0, 0));
    assert_eq!(
        daily.next_after(&at(3, 0, 0)),
        Utc.with_ymd_and_hms(2024, 5, 18, 3, 0, 0).unwrap()
    );
}

#[test]
fn test_interval_schedule() {
    let every = Schedule::Every(Duration::from_secs(90));
    assert_eq!(every.next_after(&at(10, 0, 0)), at(10, 1, 30));
}

#[test]
fn test_schedule_display() {
    assert_eq!(Schedule::Hourly { minute: 5 }.to_string(), "hourly at :05");
    assert_eq!(Schedule::Every(Duration::from_secs(60)).to_string(), "every 60s");
    assert_eq!(
        Schedule::Daily {
            at: NaiveTime::from_hms_opt(3, 30, 0).unwrap()
        }
        .to_string(),
        "daily at 03:30:00"
    );
}

#[test]
fn test_job_is_not_due_before_its_slot() {
    let mut scheduler = JobScheduler::new();
    scheduler.add(
        "cycle:front",
        Schedule::Hourly { minute: 0 },
        JobAction::Cycle { camera: 0 },
        &at(10, 15, 0),
    );

    assert!(scheduler.take_due(&at(10, 59, 59)).is_empty());
    assert_eq!(
        scheduler.take_due(&at(11, 0, 0)),
        vec![JobAction::Cycle { camera: 0 }]
    );
    assert_eq!(scheduler.jobs()[0].next_run(), &at(12, 0, 0));
}

#[test]
fn test_job_fires_once_per_due_window() {
    let mut scheduler = JobScheduler::new();
    scheduler.add(
        "heartbeat",
        Schedule::Every(Duration::from_secs(60)),
        JobAction::Heartbeat,
        &at(10, 0, 0),
    );

    // Ticks within the same window after firing see nothing due
    assert_eq!(scheduler.take_due(&at(10, 1, 0)).len(), 1);
    assert!(scheduler.take_due(&at(10, 1, 1)).is_empty());
    assert!(scheduler.take_due(&at(10, 1, 59)).is_empty());
    assert_eq!(scheduler.take_due(&at(10, 2, 0)).len(), 1);
    assert_eq!(scheduler.jobs()[0].runs(), 2);
}

#[test]
fn test_missed_slots_collapse_into_one_run() {
    let mut scheduler = JobScheduler::new();
    scheduler.add(
        "cycle:front",
        Schedule::Hourly { minute: 0 },
        JobAction::Cycle { camera: 0 },
        &at(1, 30, 0),
    );

    // Five hourly slots passed while the loop was stalled
    assert_eq!(scheduler.take_due(&at(6, 10, 0)).len(), 1);
    assert_eq!(scheduler.jobs()[0].next_run(), &at(7, 0, 0));
}

#[test]
fn test_all_due_jobs_fire_in_registration_order() {
    let mut scheduler = JobScheduler::new();
    let start = at(9, 45, 0);
    scheduler.add("cycle:a", Schedule::Hourly { minute: 0 }, JobAction::Cycle { camera: 0 }, &start);
    scheduler.add("cycle:b", Schedule::Hourly { minute: 0 }, JobAction::Cycle { camera: 1 }, &start);
    scheduler.add(
        "heartbeat",
        Schedule::Every(Duration::from_secs(600)),
        JobAction::Heartbeat,
        &start,
    );

    assert_eq!(scheduler.len(), 3);
    assert_eq!(scheduler.next_run(), Some(&at(9, 55, 0)));

    let due = scheduler.take_due(&at(10, 0, 0));
    assert_eq!(
        due,
        vec![
            JobAction::Cycle { camera: 0 },
            JobAction::Cycle { camera: 1 },
            JobAction::Heartbeat,
        ]
    );
}
