// Prometheus metrics for admission decisions
//
// - Admission decisions by outcome (counter)
// - Tokens charged against budgets (counter)
// - Quota resets (counter)

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::sync::Arc;

/// Outcome labels for `admission_decisions_total`
pub const OUTCOME_ALLOWED: &str = "allowed";
pub const OUTCOME_RATE_LIMITED: &str = "rate_limited";
pub const OUTCOME_BUDGET_EXCEEDED: &str = "budget_exceeded";

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    pub static ref ADMISSION_DECISIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("admission_decisions_total", "Admission decisions by outcome"),
        &["outcome"]
    ).expect("Failed to create admission decisions metric");

    pub static ref TOKENS_CHARGED_TOTAL: IntCounter = IntCounter::new(
        "tokens_charged_total",
        "Total tokens charged against user budgets"
    ).expect("Failed to create tokens charged metric");

    pub static ref QUOTA_RESETS_TOTAL: IntCounter = IntCounter::new(
        "quota_resets_total",
        "Total number of per-user quota resets"
    ).expect("Failed to create quota resets metric");
}

/// Initialize metrics registry - call once at startup
pub fn init() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(ADMISSION_DECISIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TOKENS_CHARGED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUOTA_RESETS_TOTAL.clone()))?;
    Ok(())
}

/// Record the outcome of one admission check
pub fn record_decision(rate_limited: bool, budget_exceeded: bool, tokens_charged: Option<u64>) {
    if !rate_limited && !budget_exceeded {
        ADMISSION_DECISIONS_TOTAL
            .with_label_values(&[OUTCOME_ALLOWED])
            .inc();
    }
    if rate_limited {
        ADMISSION_DECISIONS_TOTAL
            .with_label_values(&[OUTCOME_RATE_LIMITED])
            .inc();
    }
    if budget_exceeded {
        ADMISSION_DECISIONS_TOTAL
            .with_label_values(&[OUTCOME_BUDGET_EXCEEDED])
            .inc();
    }
    if let Some(tokens) = tokens_charged {
        TOKENS_CHARGED_TOTAL.inc_by(tokens);
    }
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Invalid UTF-8 in metrics: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_decision_counts_outcomes() {
        let allowed = ADMISSION_DECISIONS_TOTAL
            .with_label_values(&[OUTCOME_ALLOWED])
            .get();
        let limited = ADMISSION_DECISIONS_TOTAL
            .with_label_values(&[OUTCOME_RATE_LIMITED])
            .get();
        let tokens = TOKENS_CHARGED_TOTAL.get();

        record_decision(false, false, Some(42));
        record_decision(true, false, Some(8));

        // Other tests share the counters, so only check lower bounds
        assert!(
            ADMISSION_DECISIONS_TOTAL
                .with_label_values(&[OUTCOME_ALLOWED])
                .get()
                >= allowed + 1
        );
        assert!(
            ADMISSION_DECISIONS_TOTAL
                .with_label_values(&[OUTCOME_RATE_LIMITED])
                .get()
                >= limited + 1
        );
        assert!(TOKENS_CHARGED_TOTAL.get() >= tokens + 50);
    }

    #[test]
    fn test_gather_metrics() {
        // May fail if already registered, which is fine
        let _ = init();
        QUOTA_RESETS_TOTAL.inc();

        let text = gather_metrics().unwrap();
        assert!(text.contains("quota_resets_total"));
    }
}
