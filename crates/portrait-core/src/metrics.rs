//! Orchestration metrics.

use metrics::counter;

use portrait_models::TaskKind;

/// Metric name constants for consistency.
pub mod names {
    /// Status queries by kind and result.
    pub const STATUS_QUERIES_TOTAL: &str = "portrait_status_queries_total";

    /// Finished polls by kind and outcome.
    pub const POLL_OUTCOMES_TOTAL: &str = "portrait_poll_outcomes_total";

    /// Events rejected by the reconciler (stale or out of order).
    pub const IGNORED_EVENTS_TOTAL: &str = "portrait_ignored_events_total";

    /// Remote cancellations by result.
    pub const CANCELLATIONS_TOTAL: &str = "portrait_cancellations_total";
}

pub fn record_status_query(kind: TaskKind, ok: bool) {
    counter!(
        names::STATUS_QUERIES_TOTAL,
        "kind" => kind.as_str(),
        "result" => if ok { "ok" } else { "error" }
    )
    .increment(1);
}

/// `outcome` is one of `success`, `failure` or `cancelled`.
pub fn record_poll_outcome(kind: TaskKind, outcome: &'static str) {
    counter!(
        names::POLL_OUTCOMES_TOTAL,
        "kind" => kind.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_ignored_event(event: &'static str) {
    counter!(names::IGNORED_EVENTS_TOTAL, "event" => event).increment(1);
}

pub fn record_cancellation(ok: bool) {
    counter!(
        names::CANCELLATIONS_TOTAL,
        "result" => if ok { "ok" } else { "error" }
    )
    .increment(1);
}
