//! Token Budget Module
//!
//! Cumulative per-user token spending caps. Budgets have no time dimension:
//! spend only grows through successful charges and is cleared in full by a
//! reset.

pub mod manager;

pub use manager::{BudgetManager, BudgetUsage, DEFAULT_TOKEN_BUDGET};
