//! Fixed Window State
//!
//! Per-user counters for the minute and hour windows. Expiry is applied
//! lazily: every read or check first refreshes the state against the current
//! time, so no timer or background task is involved.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::config::RateLimitConfig;

/// Counters and reset instants for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Requests accepted in the current minute window
    pub minute_count: u64,

    /// Requests accepted in the current hour window
    pub hour_count: u64,

    /// Instant at which `minute_count` next resets
    pub minute_reset: DateTime<Utc>,

    /// Instant at which `hour_count` next resets
    pub hour_reset: DateTime<Utc>,
}

impl WindowState {
    /// Fresh state with both windows starting at `now`
    pub fn new(now: DateTime<Utc>, config: &RateLimitConfig) -> Self {
        Self {
            minute_count: 0,
            hour_count: 0,
            minute_reset: now + config.minute_window(),
            hour_reset: now + config.hour_window(),
        }
    }

    /// Zero and reschedule any window whose reset instant has passed
    ///
    /// A window that expired long ago gets exactly one reset, positioned at
    /// `now`. Returns true if any window was reset.
    pub fn refresh(&mut self, now: DateTime<Utc>, config: &RateLimitConfig) -> bool {
        let mut reset = false;

        if now >= self.minute_reset {
            self.minute_count = 0;
            self.minute_reset = now + config.minute_window();
            reset = true;
        }

        if now >= self.hour_reset {
            self.hour_count = 0;
            self.hour_reset = now + config.hour_window();
            reset = true;
        }

        reset
    }

    /// Copy of this state as it would look after a refresh at `now`
    pub fn refreshed(mut self, now: DateTime<Utc>, config: &RateLimitConfig) -> Self {
        self.refresh(now, config);
        self
    }

    /// Whether either window has reached its limit
    pub fn is_exhausted(&self, config: &RateLimitConfig) -> bool {
        self.minute_count >= config.requests_per_minute
            || self.hour_count >= config.requests_per_hour
    }

    /// Count one accepted request against both windows
    pub fn record(&mut self) {
        self.minute_count += 1;
        self.hour_count += 1;
    }

    /// Requests left in the tighter of the two windows
    pub fn remaining(&self, config: &RateLimitConfig) -> u64 {
        let minute = config.requests_per_minute.saturating_sub(self.minute_count);
        let hour = config.requests_per_hour.saturating_sub(self.hour_count);
        minute.min(hour)
    }

    /// Time until every exhausted window has reset
    ///
    /// `None` if a request would be admitted now, or if a zero limit means
    /// no request is ever admitted.
    pub fn retry_after(&self, now: DateTime<Utc>, config: &RateLimitConfig) -> Option<Duration> {
        if config.requests_per_minute == 0 || config.requests_per_hour == 0 {
            return None;
        }

        let mut wait: Option<Duration> = None;
        if self.minute_count >= config.requests_per_minute {
            wait = Some(self.minute_reset - now);
        }
        if self.hour_count >= config.requests_per_hour {
            let hour_wait = self.hour_reset - now;
            wait = Some(wait.map_or(hour_wait, |w| w.max(hour_wait)));
        }

        wait.map(|w| w.max(Duration::zero()))
    }

    /// Snapshot for status reporting
    pub fn usage(&self, config: &RateLimitConfig) -> WindowUsage {
        WindowUsage {
            minute: WindowSnapshot {
                used: self.minute_count,
                limit: config.requests_per_minute,
                resets_at: Some(self.minute_reset),
            },
            hour: WindowSnapshot {
                used: self.hour_count,
                limit: config.requests_per_hour,
                resets_at: Some(self.hour_reset),
            },
        }
    }
}

/// Usage of a single window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    /// Requests counted in the window
    pub used: u64,

    /// Window limit
    pub limit: u64,

    /// When the count next drops; `None` for an untracked user
    pub resets_at: Option<DateTime<Utc>>,
}

impl WindowSnapshot {
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    /// Utilization percentage
    pub fn utilization_percent(&self) -> f64 {
        if self.limit > 0 {
            (self.used as f64 / self.limit as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Usage of both windows for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowUsage {
    pub minute: WindowSnapshot,
    pub hour: WindowSnapshot,
}

impl WindowUsage {
    /// Usage of a user with no recorded requests
    pub fn fresh(config: &RateLimitConfig) -> Self {
        Self {
            minute: WindowSnapshot {
                used: 0,
                limit: config.requests_per_minute,
                resets_at: None,
            },
            hour: WindowSnapshot {
                used: 0,
                limit: config.requests_per_hour,
                resets_at: None,
            },
        }
    }

    /// Requests left in the tighter window
    pub fn remaining(&self) -> u64 {
        self.minute.remaining().min(self.hour.remaining())
    }
}
