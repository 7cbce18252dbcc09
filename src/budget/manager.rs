//! Budget Manager
//!
//! Tracks tokens spent per user against a single ceiling.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::BudgetExceeded;

/// Default token budget per user
pub const DEFAULT_TOKEN_BUDGET: u64 = 100_000;

/// Budget snapshot for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetUsage {
    /// Tokens charged so far
    pub spent: u64,

    /// Tokens still available
    pub remaining: u64,

    /// Budget ceiling
    pub budget: u64,
}

/// Per-user token budget manager
#[derive(Debug)]
pub struct BudgetManager {
    /// Ceiling per user
    token_budget: u64,

    /// Tokens spent per user
    spent: DashMap<String, u64>,
}

impl BudgetManager {
    /// Create a manager with the given per-user ceiling
    pub fn new(token_budget: u64) -> Self {
        Self {
            token_budget,
            spent: DashMap::new(),
        }
    }

    /// Per-user ceiling
    pub fn token_budget(&self) -> u64 {
        self.token_budget
    }

    /// Charge `tokens` to `user_id` if the total stays within budget
    ///
    /// Spending exactly up to the ceiling is allowed. A refused charge leaves
    /// the user's spend unchanged.
    pub fn check_budget(&self, user_id: &str, tokens: u64) -> bool {
        // Hold the entry for the read-check-write so concurrent charges serialize
        let entry = self.spent.entry(user_id.to_string());
        let current = match &entry {
            Entry::Occupied(occupied) => *occupied.get(),
            Entry::Vacant(_) => 0,
        };

        let Some(total) = self.charge(current, tokens) else {
            debug!(
                user_id,
                tokens,
                spent = current,
                budget = self.token_budget,
                "Token budget exceeded"
            );
            return false;
        };

        match entry {
            Entry::Occupied(mut occupied) => {
                occupied.insert(total);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(total);
            }
        }

        debug!(user_id, tokens, spent = total, "Tokens charged");
        true
    }

    /// New spend total if `tokens` fits on top of `current`
    fn charge(&self, current: u64, tokens: u64) -> Option<u64> {
        current
            .checked_add(tokens)
            .filter(|total| *total <= self.token_budget)
    }

    /// `check_budget` as a `Result`
    pub fn try_charge(&self, user_id: &str, tokens: u64) -> Result<(), BudgetExceeded> {
        if self.check_budget(user_id, tokens) {
            return Ok(());
        }

        Err(BudgetExceeded {
            user_id: user_id.to_string(),
            requested: tokens,
            remaining: self.get_remaining(user_id),
        })
    }

    /// Tokens left for `user_id`
    pub fn get_remaining(&self, user_id: &str) -> u64 {
        self.token_budget.saturating_sub(self.get_spent(user_id))
    }

    /// Tokens charged to `user_id`, 0 if unseen
    pub fn get_spent(&self, user_id: &str) -> u64 {
        self.spent.get(user_id).map(|spent| *spent).unwrap_or(0)
    }

    /// Snapshot for status reporting
    pub fn usage(&self, user_id: &str) -> BudgetUsage {
        let spent = self.get_spent(user_id);
        BudgetUsage {
            spent,
            remaining: self.token_budget.saturating_sub(spent),
            budget: self.token_budget,
        }
    }

    /// Clear the user's spend
    pub fn reset(&self, user_id: &str) {
        if self.spent.remove(user_id).is_some() {
            info!(user_id, "Token budget reset");
        }
    }

    /// Number of users with recorded spend
    pub fn tracked_users(&self) -> usize {
        self.spent.len()
    }
}

impl Default for BudgetManager {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_BUDGET)
    }
}
