//! Property-Based Tests for Quota Accounting
//!
//! Invariants checked over random inputs:
//!
//! - **Budget**: charges never push spend past the ceiling, refused charges
//!   leave spend untouched, and the boundary is inclusive
//! - **Fixed windows**: exactly `min(rpm, rph)` consecutive checks succeed
//!   within one window, and denied checks consume nothing
//! - **Isolation**: exhausting one user never touches another
//!
//! # Running the Tests
//!
//! ```bash
//! cargo test --lib proptests
//! ```

use proptest::prelude::*;
use std::sync::Arc;

use crate::budget::BudgetManager;
use crate::rate_limit::{
    ManualClock, RateLimitConfig, RateLimiter, RequestLimiter, SlidingWindowLimiter,
};

// ============================================================================
// Property 1: Budget accounting
// ============================================================================

proptest! {
    /// A single charge within budget on a fresh user succeeds and is recorded
    #[test]
    fn prop_fresh_charge_within_budget(budget in 0u64..1_000_000, frac in 0.0f64..=1.0) {
        let tokens = (budget as f64 * frac) as u64;
        let manager = BudgetManager::new(budget);

        prop_assert!(manager.check_budget("user", tokens));
        prop_assert_eq!(manager.get_spent("user"), tokens);
        prop_assert_eq!(manager.get_remaining("user"), budget - tokens);
    }

    /// Boundary is inclusive: exactly the budget passes, one more fails
    #[test]
    fn prop_budget_boundary(budget in 0u64..u64::MAX) {
        let manager = BudgetManager::new(budget);
        prop_assert!(!manager.check_budget("over", budget + 1));
        prop_assert!(manager.check_budget("exact", budget));
    }

    /// Spend tracks exactly the accepted charges and never exceeds budget
    #[test]
    fn prop_spend_matches_accepted_charges(
        budget in 0u64..10_000,
        charges in prop::collection::vec(0u64..2_000, 0..50)
    ) {
        let manager = BudgetManager::new(budget);
        let mut expected = 0u64;

        for tokens in charges {
            let before = manager.get_spent("user");
            let accepted = manager.check_budget("user", tokens);

            prop_assert_eq!(accepted, before + tokens <= budget);
            if accepted {
                expected += tokens;
            } else {
                prop_assert_eq!(manager.get_spent("user"), before);
            }
            prop_assert!(manager.get_spent("user") <= budget);
        }

        prop_assert_eq!(manager.get_spent("user"), expected);
        prop_assert_eq!(manager.get_remaining("user"), budget - expected);
    }

    /// Reset restores the full budget
    #[test]
    fn prop_budget_reset(budget in 1u64..100_000, tokens in 0u64..100_000) {
        let manager = BudgetManager::new(budget);
        manager.check_budget("user", tokens);
        manager.reset("user");

        prop_assert_eq!(manager.get_remaining("user"), budget);
        prop_assert_eq!(manager.get_spent("user"), 0);
    }
}

// ============================================================================
// Property 2: Fixed window counting
// ============================================================================

proptest! {
    /// Exactly min(rpm, rph) checks succeed in one window; extra denials are free
    #[test]
    fn prop_window_admits_exactly_limit(
        rpm in 0u64..50,
        rph in 0u64..50,
        extra in 1usize..10
    ) {
        let clock = Arc::new(ManualClock::default());
        let limiter = RateLimiter::with_clock(RateLimitConfig::new(rpm, rph), clock);
        let limit = rpm.min(rph);

        for _ in 0..limit {
            prop_assert!(limiter.check_limit("user"));
        }
        for _ in 0..extra {
            prop_assert!(!limiter.check_limit("user"));
        }

        let usage = limiter.usage("user");
        prop_assert_eq!(usage.minute.used, limit);
        prop_assert_eq!(usage.hour.used, limit);
        prop_assert_eq!(limiter.get_remaining("user"), 0);
    }

    /// Remaining always equals the tighter window's headroom
    #[test]
    fn prop_remaining_is_min_of_windows(rpm in 1u64..30, rph in 1u64..30, calls in 0usize..40) {
        let clock = Arc::new(ManualClock::default());
        let limiter = RateLimiter::with_clock(RateLimitConfig::new(rpm, rph), clock);

        let mut accepted = 0u64;
        for _ in 0..calls {
            if limiter.check_limit("user") {
                accepted += 1;
            }
        }

        let expected = rpm.saturating_sub(accepted).min(rph.saturating_sub(accepted));
        prop_assert_eq!(limiter.get_remaining("user"), expected);
    }

    /// Reset always re-admits immediately
    #[test]
    fn prop_reset_readmits(rpm in 1u64..20, calls in 0usize..40) {
        let limiter = RateLimiter::new(rpm, 1000);
        for _ in 0..calls {
            limiter.check_limit("user");
        }

        limiter.reset("user");
        prop_assert!(limiter.check_limit("user"));
    }
}

// ============================================================================
// Property 3: User isolation
// ============================================================================

proptest! {
    /// Exhausting one user leaves another at its initial remaining value
    #[test]
    fn prop_users_are_isolated(
        rpm in 1u64..20,
        rph in 1u64..20,
        budget in 0u64..1_000,
        sliding in any::<bool>()
    ) {
        let clock = Arc::new(ManualClock::default());
        let config = RateLimitConfig::new(rpm, rph);
        let limiter: Box<dyn RequestLimiter> = if sliding {
            Box::new(SlidingWindowLimiter::with_clock(config, clock))
        } else {
            Box::new(RateLimiter::with_clock(config, clock))
        };
        let manager = BudgetManager::new(budget);

        while limiter.check_limit("noisy") {}
        manager.check_budget("noisy", budget);

        prop_assert_eq!(limiter.get_remaining("quiet"), rpm.min(rph));
        prop_assert_eq!(manager.get_remaining("quiet"), budget);
    }
}
