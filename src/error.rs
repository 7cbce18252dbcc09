//! Gate Error Types
//!
//! Quota exhaustion is an ordinary outcome and the boolean checks remain the
//! primary contract. These types are for callers that prefer `?`.

/// Request rate quota exhausted for a user
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Rate limit exceeded for user '{user_id}'")]
pub struct RateLimitExceeded {
    /// User that was denied
    pub user_id: String,

    /// Seconds until a request may be admitted again, if known
    pub retry_after_secs: Option<u64>,
}

/// Token budget exhausted for a user
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Budget exceeded for user '{user_id}': requested {requested} tokens, {remaining} remaining")]
pub struct BudgetExceeded {
    /// User that was denied
    pub user_id: String,

    /// Tokens the request asked for
    pub requested: u64,

    /// Tokens left in the budget
    pub remaining: u64,
}

/// Admission denial reported by the policy gate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// Request rate quota exhausted
    #[error(transparent)]
    RateLimitExceeded(#[from] RateLimitExceeded),

    /// Token budget exhausted
    #[error(transparent)]
    BudgetExceeded(#[from] BudgetExceeded),
}

impl GateError {
    /// User the denial applies to
    pub fn user_id(&self) -> &str {
        match self {
            GateError::RateLimitExceeded(e) => &e.user_id,
            GateError::BudgetExceeded(e) => &e.user_id,
        }
    }
}
