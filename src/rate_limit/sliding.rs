//! Sliding Window Rate Limiter
//!
//! Stricter alternative to the fixed window limiter. Keeps the timestamps of
//! accepted requests for the last hour and counts those that fall inside the
//! trailing minute and hour, so a client cannot burst to twice the limit
//! across a window boundary. Memory per user is bounded by
//! `requests_per_hour`.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::config::{RateLimitConfig, WindowMode};
use super::limiter::RequestLimiter;
use super::window::{WindowSnapshot, WindowUsage};

/// Accepted request timestamps for one user, oldest first
#[derive(Debug, Clone, Default)]
struct RequestLog {
    accepted: VecDeque<DateTime<Utc>>,
}

impl RequestLog {
    /// Drop entries older than the hour window
    fn prune(&mut self, now: DateTime<Utc>, hour: Duration) {
        while let Some(oldest) = self.accepted.front() {
            if now >= *oldest + hour {
                self.accepted.pop_front();
            } else {
                break;
            }
        }
    }

    /// Entries inside the trailing `window`, oldest first
    fn within(&self, now: DateTime<Utc>, window: Duration) -> Vec<DateTime<Utc>> {
        self.accepted
            .iter()
            .filter(|t| now < **t + window)
            .copied()
            .collect()
    }

    /// Expiry of the entry that must age out before `limit` is free again
    fn unblocks_at(entries: &[DateTime<Utc>], limit: u64, window: Duration) -> Option<DateTime<Utc>> {
        let count = entries.len() as u64;
        if count < limit {
            return None;
        }
        let index = (count - limit) as usize;
        entries.get(index).map(|t| *t + window)
    }
}

/// Sliding window rate limiter
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    /// Limits
    config: RateLimitConfig,

    /// Time source
    clock: Arc<dyn Clock>,

    /// Request log per user
    users: DashMap<String, RequestLog>,
}

impl SlidingWindowLimiter {
    /// Create a limiter using the system clock
    pub fn new(requests_per_minute: u64, requests_per_hour: u64) -> Self {
        Self::with_clock(
            RateLimitConfig::new(requests_per_minute, requests_per_hour),
            Arc::new(SystemClock),
        )
    }

    /// Create a limiter with an explicit time source
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: config.with_window_mode(WindowMode::Sliding),
            clock,
            users: DashMap::new(),
        }
    }

    /// Number of users with a request log
    pub fn tracked_users(&self) -> usize {
        self.users.len()
    }

    /// Live entries for both windows as of now
    fn windows(&self, user_id: &str) -> Option<(Vec<DateTime<Utc>>, Vec<DateTime<Utc>>, DateTime<Utc>)> {
        let now = self.clock.now();
        self.users.get(user_id).map(|log| {
            (
                log.within(now, self.config.minute_window()),
                log.within(now, self.config.hour_window()),
                now,
            )
        })
    }
}

impl RequestLimiter for SlidingWindowLimiter {
    fn check_limit(&self, user_id: &str) -> bool {
        let now = self.clock.now();
        let minute = self.config.minute_window();
        let hour = self.config.hour_window();

        let mut entry = self.users.entry(user_id.to_string()).or_default();
        let log = entry.value_mut();
        log.prune(now, hour);

        let minute_count = log.within(now, minute).len() as u64;
        let hour_count = log.accepted.len() as u64;

        if minute_count >= self.config.requests_per_minute
            || hour_count >= self.config.requests_per_hour
        {
            debug!(user_id, minute_count, hour_count, "Sliding rate limit reached");
            return false;
        }

        log.accepted.push_back(now);
        true
    }

    fn get_remaining(&self, user_id: &str) -> u64 {
        self.usage(user_id).remaining()
    }

    fn reset(&self, user_id: &str) {
        if self.users.remove(user_id).is_some() {
            info!(user_id, "Sliding rate limit state reset");
        }
    }

    fn usage(&self, user_id: &str) -> WindowUsage {
        let Some((minute, hour, _)) = self.windows(user_id) else {
            return WindowUsage::fresh(&self.config);
        };

        WindowUsage {
            minute: WindowSnapshot {
                used: minute.len() as u64,
                limit: self.config.requests_per_minute,
                resets_at: minute.first().map(|t| *t + self.config.minute_window()),
            },
            hour: WindowSnapshot {
                used: hour.len() as u64,
                limit: self.config.requests_per_hour,
                resets_at: hour.first().map(|t| *t + self.config.hour_window()),
            },
        }
    }

    fn retry_after(&self, user_id: &str) -> Option<Duration> {
        if self.config.requests_per_minute == 0 || self.config.requests_per_hour == 0 {
            return None;
        }

        let (minute, hour, now) = self.windows(user_id)?;
        let minute_at = RequestLog::unblocks_at(
            &minute,
            self.config.requests_per_minute,
            self.config.minute_window(),
        );
        let hour_at =
            RequestLog::unblocks_at(&hour, self.config.requests_per_hour, self.config.hour_window());

        let at = match (minute_at, hour_at) {
            (Some(m), Some(h)) => m.max(h),
            (Some(m), None) => m,
            (None, Some(h)) => h,
            (None, None) => return None,
        };

        Some((at - now).max(Duration::zero()))
    }

    fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::clock::ManualClock;

    fn manual(rpm: u64, rph: u64) -> (SlidingWindowLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let limiter = SlidingWindowLimiter::with_clock(RateLimitConfig::new(rpm, rph), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_config_reports_sliding_mode() {
        let limiter = SlidingWindowLimiter::new(2, 100);
        assert_eq!(limiter.config().window_mode, WindowMode::Sliding);
    }

    #[test]
    fn test_blocks_over_minute_limit() {
        let limiter = SlidingWindowLimiter::new(2, 100);
        assert!(limiter.check_limit("user1"));
        assert!(limiter.check_limit("user1"));
        assert!(!limiter.check_limit("user1"));
        assert_eq!(limiter.get_remaining("user1"), 0);
    }

    #[test]
    fn test_blocks_over_hour_limit() {
        let limiter = SlidingWindowLimiter::new(100, 2);
        assert!(limiter.check_limit("user1"));
        assert!(limiter.check_limit("user1"));
        assert!(!limiter.check_limit("user1"));
    }

    #[test]
    fn test_no_boundary_burst() {
        let (limiter, clock) = manual(3, 100);

        assert!(limiter.check_limit("user1"));
        clock.advance_secs(59);
        assert!(limiter.check_limit("user1"));
        assert!(limiter.check_limit("user1"));

        // The fixed limiter would admit a full batch here
        clock.advance_secs(1);
        assert!(limiter.check_limit("user1"));
        assert!(!limiter.check_limit("user1"));
    }

    #[test]
    fn test_request_admitted_when_oldest_ages_out() {
        let (limiter, clock) = manual(2, 100);
        assert!(limiter.check_limit("user1"));
        clock.advance_secs(10);
        assert!(limiter.check_limit("user1"));
        assert!(!limiter.check_limit("user1"));

        assert_eq!(limiter.retry_after("user1"), Some(Duration::seconds(50)));

        clock.advance_secs(49);
        assert!(!limiter.check_limit("user1"));
        clock.advance_secs(1);
        assert!(limiter.check_limit("user1"));
    }

    #[test]
    fn test_usage_and_remaining_are_read_only() {
        let (limiter, clock) = manual(5, 100);
        assert_eq!(limiter.get_remaining("user1"), 5);
        assert_eq!(limiter.tracked_users(), 0);

        limiter.check_limit("user1");
        clock.advance_secs(30);
        limiter.check_limit("user1");

        let usage = limiter.usage("user1");
        assert_eq!(usage.minute.used, 2);
        assert_eq!(usage.hour.used, 2);
        assert_eq!(
            usage.minute.resets_at,
            Some(DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(60))
        );

        clock.advance_secs(31);
        assert_eq!(limiter.usage("user1").minute.used, 1);
        assert_eq!(limiter.get_remaining("user1"), 4);
    }

    #[test]
    fn test_hour_log_is_pruned() {
        let (limiter, clock) = manual(10, 3);
        for _ in 0..3 {
            assert!(limiter.check_limit("user1"));
        }
        assert!(!limiter.check_limit("user1"));

        clock.advance_secs(3600);
        assert!(limiter.check_limit("user1"));
        assert_eq!(limiter.usage("user1").hour.used, 1);
    }

    #[test]
    fn test_reset() {
        let limiter = SlidingWindowLimiter::new(1, 100);
        assert!(limiter.check_limit("user1"));
        assert!(!limiter.check_limit("user1"));

        limiter.reset("user1");
        limiter.reset("user1");
        assert!(limiter.check_limit("user1"));
    }

    #[test]
    fn test_zero_limit() {
        let limiter = SlidingWindowLimiter::new(0, 0);
        assert!(!limiter.check_limit("user1"));
        assert_eq!(limiter.retry_after("user1"), None);
    }
}
