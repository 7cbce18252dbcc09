//! Fixed Window Rate Limiter
//!
//! Per-user request counting over a minute window and an hour window. Each
//! window snaps to zero at a single reset instant; there is no rolling
//! average and no calendar alignment.

use chrono::Duration;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use super::clock::{Clock, SystemClock};
use super::config::RateLimitConfig;
use super::window::{WindowState, WindowUsage};
use crate::error::RateLimitExceeded;

/// Per-user request limiter
///
/// Implementations must make `check_limit` atomic per user: two concurrent
/// calls for the same user never both take the last unit of quota.
pub trait RequestLimiter: Send + Sync + fmt::Debug {
    /// Admit one request for `user_id`, consuming quota on success
    ///
    /// A denied call consumes nothing.
    fn check_limit(&self, user_id: &str) -> bool;

    /// Requests left in the tighter window, without side effects
    fn get_remaining(&self, user_id: &str) -> u64;

    /// Forget all state for `user_id`
    fn reset(&self, user_id: &str);

    /// Per-window usage snapshot, without side effects
    fn usage(&self, user_id: &str) -> WindowUsage;

    /// Time until the user may be admitted again, if currently denied
    fn retry_after(&self, user_id: &str) -> Option<Duration>;

    /// Limits this limiter enforces
    fn config(&self) -> &RateLimitConfig;

    /// `check_limit` as a `Result`
    fn try_acquire(&self, user_id: &str) -> Result<(), RateLimitExceeded> {
        if self.check_limit(user_id) {
            return Ok(());
        }

        Err(RateLimitExceeded {
            user_id: user_id.to_string(),
            retry_after_secs: self.retry_after(user_id).map(ceil_secs),
        })
    }
}

/// Round a wait up to whole seconds
pub(crate) fn ceil_secs(wait: Duration) -> u64 {
    let millis = wait.num_milliseconds().max(0) as u64;
    millis.div_ceil(1000)
}

/// Fixed window rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    /// Limits
    config: RateLimitConfig,

    /// Time source
    clock: Arc<dyn Clock>,

    /// Window state per user
    users: DashMap<String, WindowState>,
}

impl RateLimiter {
    /// Create a limiter using the system clock
    pub fn new(requests_per_minute: u64, requests_per_hour: u64) -> Self {
        Self::with_config(RateLimitConfig::new(requests_per_minute, requests_per_hour))
    }

    /// Create a limiter from configuration using the system clock
    pub fn with_config(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a limiter with an explicit time source
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            users: DashMap::new(),
        }
    }

    /// Number of users with window state
    pub fn tracked_users(&self) -> usize {
        self.users.len()
    }

    /// Current state for a user as of now, if tracked
    fn current_state(&self, user_id: &str) -> Option<WindowState> {
        let now = self.clock.now();
        self.users
            .get(user_id)
            .map(|state| state.refreshed(now, &self.config))
    }
}

impl RequestLimiter for RateLimiter {
    fn check_limit(&self, user_id: &str) -> bool {
        let now = self.clock.now();

        // The entry guard holds the shard lock for the whole check-then-record
        let mut entry = self
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| WindowState::new(now, &self.config));
        let state = entry.value_mut();

        if state.refresh(now, &self.config) {
            debug!(user_id, "Rate limit window reset");
        }

        if state.is_exhausted(&self.config) {
            debug!(
                user_id,
                minute_count = state.minute_count,
                hour_count = state.hour_count,
                "Rate limit reached"
            );
            return false;
        }

        state.record();
        true
    }

    fn get_remaining(&self, user_id: &str) -> u64 {
        match self.current_state(user_id) {
            Some(state) => state.remaining(&self.config),
            None => self.config.fresh_remaining(),
        }
    }

    fn reset(&self, user_id: &str) {
        if self.users.remove(user_id).is_some() {
            info!(user_id, "Rate limit state reset");
        }
    }

    fn usage(&self, user_id: &str) -> WindowUsage {
        match self.current_state(user_id) {
            Some(state) => state.usage(&self.config),
            None => WindowUsage::fresh(&self.config),
        }
    }

    fn retry_after(&self, user_id: &str) -> Option<Duration> {
        let now = self.clock.now();
        self.current_state(user_id)
            .and_then(|state| state.retry_after(now, &self.config))
    }

    fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}
