//! Policy Gate
//!
//! Combines a request limiter and a budget manager into a single admission
//! decision. Both quotas are consulted on every request and the request is
//! allowed only if both succeed.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::budget::{BudgetManager, BudgetUsage};
use crate::config::GateConfig;
use crate::error::{BudgetExceeded, GateError, RateLimitExceeded};
use crate::metrics;
use crate::rate_limit::limiter::ceil_secs;
use crate::rate_limit::{build_limiter, Clock, RequestLimiter, SystemClock, WindowMode, WindowUsage};

/// Denial reason shown for an exhausted request rate quota
pub const RATE_LIMIT_REASON: &str = "Rate limit exceeded";

/// Denial reason shown for an exhausted token budget
pub const BUDGET_REASON: &str = "Budget exceeded";

/// Result of an admission check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    /// User the request belongs to
    pub user_id: String,

    /// Tokens the request asked for
    pub tokens: u64,

    /// Whether the request is allowed
    pub allowed: bool,

    /// Request rate quota was exhausted
    pub rate_limited: bool,

    /// Token budget was exhausted
    pub budget_exceeded: bool,

    /// Requests left after this check
    pub remaining_requests: u64,

    /// Tokens left after this check
    pub remaining_tokens: u64,

    /// Seconds until the rate quota frees up (if rate limited)
    pub retry_after_secs: Option<u64>,
}

impl AdmissionDecision {
    /// Human readable reasons for a denial, rate limit first
    pub fn reasons(&self) -> Vec<&'static str> {
        let mut reasons = Vec::new();
        if self.rate_limited {
            reasons.push(RATE_LIMIT_REASON);
        }
        if self.budget_exceeded {
            reasons.push(BUDGET_REASON);
        }
        reasons
    }

    /// Convert a denial into an error, rate limit taking precedence
    pub fn into_result(self) -> Result<Self, GateError> {
        if self.rate_limited {
            return Err(RateLimitExceeded {
                user_id: self.user_id,
                retry_after_secs: self.retry_after_secs,
            }
            .into());
        }

        if self.budget_exceeded {
            return Err(BudgetExceeded {
                user_id: self.user_id,
                requested: self.tokens,
                remaining: self.remaining_tokens,
            }
            .into());
        }

        Ok(self)
    }
}

/// Read-only quota snapshot for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatus {
    /// User identifier
    pub user_id: String,

    /// Window counting mode in effect
    pub window_mode: WindowMode,

    /// Request window usage
    pub requests: WindowUsage,

    /// Token budget usage
    pub budget: BudgetUsage,
}

impl UserStatus {
    /// Requests left in the tighter window
    pub fn remaining_requests(&self) -> u64 {
        self.requests.remaining()
    }
}

/// Admission gate over a request limiter and a token budget
#[derive(Debug, Clone)]
pub struct PolicyGate {
    /// Request rate limiter
    limiter: Arc<dyn RequestLimiter>,

    /// Token budgets
    budget: Arc<BudgetManager>,
}

impl PolicyGate {
    /// Create a gate over existing components
    pub fn new(limiter: Arc<dyn RequestLimiter>, budget: Arc<BudgetManager>) -> Self {
        Self { limiter, budget }
    }

    /// Create a gate from configuration using the system clock
    pub fn from_config(config: &GateConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a gate from configuration with an explicit time source
    pub fn with_clock(config: &GateConfig, clock: Arc<dyn Clock>) -> Self {
        let limiter = build_limiter(config.rate_limit(), clock);
        let budget = Arc::new(BudgetManager::new(config.token_budget));

        debug!(
            requests_per_minute = config.requests_per_minute,
            requests_per_hour = config.requests_per_hour,
            token_budget = config.token_budget,
            window_mode = %config.window_mode,
            "Policy gate created"
        );

        Self::new(limiter, budget)
    }

    /// Check a request of `tokens` for `user_id`
    ///
    /// Both quotas are always consulted, so a request denied by one quota may
    /// still have consumed the other.
    pub fn check(&self, user_id: &str, tokens: u64) -> AdmissionDecision {
        let rate_ok = self.limiter.check_limit(user_id);
        let budget_ok = self.budget.check_budget(user_id, tokens);

        let retry_after_secs = if rate_ok {
            None
        } else {
            self.limiter.retry_after(user_id).map(ceil_secs)
        };

        let decision = AdmissionDecision {
            user_id: user_id.to_string(),
            tokens,
            allowed: rate_ok && budget_ok,
            rate_limited: !rate_ok,
            budget_exceeded: !budget_ok,
            remaining_requests: self.limiter.get_remaining(user_id),
            remaining_tokens: self.budget.get_remaining(user_id),
            retry_after_secs,
        };

        metrics::record_decision(
            decision.rate_limited,
            decision.budget_exceeded,
            budget_ok.then_some(tokens),
        );

        if decision.allowed {
            debug!(
                user_id,
                tokens,
                remaining_requests = decision.remaining_requests,
                remaining_tokens = decision.remaining_tokens,
                "Request allowed"
            );
        } else {
            warn!(
                user_id,
                tokens,
                rate_limited = decision.rate_limited,
                budget_exceeded = decision.budget_exceeded,
                "Request blocked"
            );
        }

        decision
    }

    /// `check` as a `Result`
    pub fn enforce(&self, user_id: &str, tokens: u64) -> Result<AdmissionDecision, GateError> {
        self.check(user_id, tokens).into_result()
    }

    /// Current quota usage for `user_id`, without side effects
    pub fn status(&self, user_id: &str) -> UserStatus {
        UserStatus {
            user_id: user_id.to_string(),
            window_mode: self.limiter.config().window_mode,
            requests: self.limiter.usage(user_id),
            budget: self.budget.usage(user_id),
        }
    }

    /// Reset both quotas for `user_id`
    pub fn reset(&self, user_id: &str) {
        self.limiter.reset(user_id);
        self.budget.reset(user_id);
        metrics::QUOTA_RESETS_TOTAL.inc();
        info!(user_id, "Quotas reset");
    }

    /// Request limiter
    pub fn limiter(&self) -> &Arc<dyn RequestLimiter> {
        &self.limiter
    }

    /// Budget manager
    pub fn budget(&self) -> &Arc<BudgetManager> {
        &self.budget
    }
}
