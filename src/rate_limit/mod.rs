//! Request Rate Limiting Module
//!
//! Per-user request rate limiting over a minute window and an hour window.
//!
//! # Features
//!
//! - Fixed windows that reset to zero at a single instant (default)
//! - Optional sliding windows that count the trailing minute and hour
//! - Lazy window refresh on access, no background timers
//! - Pluggable [`Clock`] for deterministic tests
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   RequestLimiter (trait)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────┐     ┌──────────────────────┐      │
//! │  │ RateLimiter          │     │ SlidingWindowLimiter │      │
//! │  │ (fixed windows)      │     │ (request log)        │      │
//! │  └──────────────────────┘     └──────────────────────┘      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │        Per-user state (sharded DashMap) + Clock      │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod clock;
pub mod config;
pub mod limiter;
pub mod sliding;
pub mod window;

use std::sync::Arc;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RateLimitConfig, WindowMode};
pub use limiter::{RateLimiter, RequestLimiter};
pub use sliding::SlidingWindowLimiter;
pub use window::{WindowSnapshot, WindowState, WindowUsage};

/// Build the limiter selected by `config.window_mode`
pub fn build_limiter(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Arc<dyn RequestLimiter> {
    match config.window_mode {
        WindowMode::Fixed => Arc::new(RateLimiter::with_clock(config, clock)),
        WindowMode::Sliding => Arc::new(SlidingWindowLimiter::with_clock(config, clock)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_limiter_respects_mode() {
        let fixed = build_limiter(RateLimitConfig::new(1, 10), Arc::new(SystemClock));
        assert_eq!(fixed.config().window_mode, WindowMode::Fixed);

        let sliding = build_limiter(
            RateLimitConfig::new(1, 10).with_window_mode(WindowMode::Sliding),
            Arc::new(SystemClock),
        );
        assert_eq!(sliding.config().window_mode, WindowMode::Sliding);
        assert!(sliding.check_limit("user1"));
        assert!(!sliding.check_limit("user1"));
    }
}
