//! Alerting metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the host
//! installs a recorder.

use metrics::{counter, histogram};

/// Record one rule evaluation and how long it took.
pub fn record_rule_evaluated(rule_kind: &'static str, duration_secs: f64) {
    counter!("alert_rules_evaluated_total", "kind" => rule_kind).increment(1);
    histogram!("alert_evaluation_duration_seconds", "kind" => rule_kind).record(duration_secs);
}

/// Record a published alert.
pub fn record_alert_published(severity: &'static str) {
    counter!("alerts_published_total", "severity" => severity).increment(1);
}

/// Record a failed rule evaluation or publish.
pub fn record_rule_failure(code: &'static str) {
    counter!("alert_rule_failures_total", "code" => code).increment(1);
}
