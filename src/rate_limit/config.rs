//! Rate Limit Configuration
//!
//! Limits and window lengths for per-user request rate limiting.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default rate limits
pub const DEFAULT_REQUESTS_PER_MINUTE: u64 = 60;
pub const DEFAULT_REQUESTS_PER_HOUR: u64 = 1000;

/// Window lengths in seconds
pub const MINUTE_WINDOW_SECS: i64 = 60;
pub const HOUR_WINDOW_SECS: i64 = 3600;

/// How request windows are counted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    /// Counter snaps to zero at a single reset instant per window
    #[default]
    Fixed,
    /// Counts accepted requests in the trailing window
    Sliding,
}

impl WindowMode {
    pub fn is_fixed(&self) -> bool {
        matches!(self, WindowMode::Fixed)
    }
}

impl fmt::Display for WindowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowMode::Fixed => write!(f, "fixed"),
            WindowMode::Sliding => write!(f, "sliding"),
        }
    }
}

impl FromStr for WindowMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(WindowMode::Fixed),
            "sliding" => Ok(WindowMode::Sliding),
            other => anyhow::bail!(
                "Invalid window mode: {}. Must be one of: fixed, sliding",
                other
            ),
        }
    }
}

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Max accepted requests per minute window
    pub requests_per_minute: u64,

    /// Max accepted requests per hour window
    pub requests_per_hour: u64,

    /// Window counting mode
    #[serde(default)]
    pub window_mode: WindowMode,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            requests_per_hour: DEFAULT_REQUESTS_PER_HOUR,
            window_mode: WindowMode::Fixed,
        }
    }
}

impl RateLimitConfig {
    /// Create a fixed-window configuration
    pub fn new(requests_per_minute: u64, requests_per_hour: u64) -> Self {
        Self {
            requests_per_minute,
            requests_per_hour,
            window_mode: WindowMode::Fixed,
        }
    }

    /// Switch to the given window mode
    pub fn with_window_mode(mut self, window_mode: WindowMode) -> Self {
        self.window_mode = window_mode;
        self
    }

    /// Length of the minute window
    pub fn minute_window(&self) -> Duration {
        Duration::seconds(MINUTE_WINDOW_SECS)
    }

    /// Length of the hour window
    pub fn hour_window(&self) -> Duration {
        Duration::seconds(HOUR_WINDOW_SECS)
    }

    /// Remaining requests for a user who has never been seen
    pub fn fresh_remaining(&self) -> u64 {
        self.requests_per_minute.min(self.requests_per_hour)
    }
}
