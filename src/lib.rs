//! Policy Gate Library
//!
//! Admission control for inference requests. A request from a user is
//! admitted only if both the request-rate quota ([`rate_limit`]) and the
//! token budget ([`budget`]) allow it; [`gate::PolicyGate`] combines the two.

pub mod budget;
pub mod config;
pub mod error;
pub mod gate;
pub mod logging;
pub mod metrics;
pub mod rate_limit;

#[cfg(test)]
mod proptests;

pub use budget::BudgetManager;
pub use config::GateConfig;
pub use error::{BudgetExceeded, GateError, RateLimitExceeded};
pub use gate::{AdmissionDecision, PolicyGate, UserStatus};
pub use rate_limit::{RateLimiter, RequestLimiter, SlidingWindowLimiter};
