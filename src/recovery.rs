use crate::config::RestartConfig;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// What the supervisor should do about a recorder that is not running
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    /// Start the recorder now
    Start,
    /// Still backing off; try again after the delay
    RetryAfterDelay(Duration),
}

/// Restart policy configuration
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Delay after the second consecutive failure; zero disables backoff
    pub base_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
    /// Uptime after which an exit no longer counts as a failure
    pub stable_after: Duration,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            stable_after: Duration::from_secs(10),
        }
    }
}

impl From<&RestartConfig> for RecoveryConfig {
    fn from(config: &RestartConfig) -> Self {
        Self {
            base_delay: Duration::from_secs(config.backoff_base_seconds),
            max_delay: Duration::from_secs(config.backoff_max_seconds),
            stable_after: Duration::from_secs(config.stable_after_seconds),
        }
    }
}

impl RecoveryConfig {
    /// Retry on every tick, never defer
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            stable_after: Duration::ZERO,
        }
    }
}

/// Tracks consecutive start failures of one recorder
#[derive(Debug)]
pub struct RestartTracker {
    config: RecoveryConfig,
    consecutive_failures: u32,
    next_attempt: Option<Instant>,
}

impl RestartTracker {
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            config,
            consecutive_failures: 0,
            next_attempt: None,
        }
    }

    /// Decide whether a start may be attempted at `now`
    pub fn next_action(&self, now: Instant) -> RecoveryAction {
        match self.next_attempt {
            Some(at) if at > now => RecoveryAction::RetryAfterDelay(at - now),
            _ => RecoveryAction::Start,
        }
    }

    /// Register a failed start and return the imposed delay
    pub fn record_failure(&mut self, now: Instant) -> Duration {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let delay = self.calculate_delay(self.consecutive_failures);
        self.next_attempt = Some(now + delay);

        debug!(
            "Failure {} recorded, next attempt in {:?}",
            self.consecutive_failures, delay
        );
        delay
    }

    /// Register an observed exit. Short-lived runs count as failures.
    pub fn record_exit(&mut self, uptime: Duration, now: Instant) -> Option<Duration> {
        if uptime < self.config.stable_after {
            Some(self.record_failure(now))
        } else {
            self.reset();
            None
        }
    }

    pub fn reset(&mut self) {
        if self.consecutive_failures > 0 {
            info!(
                "Recovered after {} consecutive failures",
                self.consecutive_failures
            );
        }
        self.consecutive_failures = 0;
        self.next_attempt = None;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Exponential backoff: the first failure retries at once, then
    /// base * 2^(failures - 2), capped at the maximum
    fn calculate_delay(&self, failures: u32) -> Duration {
        if failures < 2 || self.config.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let factor = 1u32.checked_shl(failures - 2).unwrap_or(u32::MAX);
        self.config
            .base_delay
            .checked_mul(factor)
            .unwrap_or(self.config.max_delay)
            .min(self.config.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> RestartTracker {
        RestartTracker::new(RecoveryConfig {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            stable_after: Duration::from_secs(10),
        })
    }

    #[test]
    fn test_fresh_tracker_allows_start() {
        let tracker = tracker();
        assert_eq!(tracker.next_action(Instant::now()), RecoveryAction::Start);
        assert_eq!(tracker.consecutive_failures(), 0);
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let mut tracker = tracker();
        let now = Instant::now();

        let delays: Vec<u64> = (0..7)
            .map(|_| tracker.record_failure(now).as_secs())
            .collect();
        assert_eq!(delays, vec![0, 1, 2, 4, 8, 8, 8]);
    }

    #[test]
    fn test_first_failure_retries_immediately() {
        let mut tracker = tracker();
        let now = Instant::now();

        assert_eq!(tracker.record_failure(now), Duration::ZERO);
        assert_eq!(tracker.consecutive_failures(), 1);
        assert_eq!(tracker.next_action(now), RecoveryAction::Start);
    }

    #[test]
    fn test_backoff_defers_until_elapsed() {
        let mut tracker = tracker();
        let now = Instant::now();
        tracker.record_failure(now);
        tracker.record_failure(now);
        tracker.record_failure(now);

        match tracker.next_action(now + Duration::from_millis(500)) {
            RecoveryAction::RetryAfterDelay(remaining) => {
                assert_eq!(remaining, Duration::from_millis(1500));
            }
            other => panic!("expected backoff, got {:?}", other),
        }
        assert_eq!(
            tracker.next_action(now + Duration::from_secs(2)),
            RecoveryAction::Start
        );
    }

    #[test]
    fn test_short_run_counts_as_failure_long_run_resets() {
        let mut tracker = tracker();
        let now = Instant::now();

        assert!(tracker.record_exit(Duration::from_secs(2), now).is_some());
        assert!(tracker.record_exit(Duration::from_secs(2), now).is_some());
        assert_eq!(tracker.consecutive_failures(), 2);

        assert!(tracker.record_exit(Duration::from_secs(3600), now).is_none());
        assert_eq!(tracker.consecutive_failures(), 0);
        assert_eq!(tracker.next_action(now), RecoveryAction::Start);
    }

    #[test]
    fn test_immediate_policy_never_defers() {
        let mut tracker = RestartTracker::new(RecoveryConfig::immediate());
        let now = Instant::now();
        for _ in 0..40 {
            assert_eq!(tracker.record_failure(now), Duration::ZERO);
        }
        assert_eq!(tracker.next_action(now), RecoveryAction::Start);
    }
}
