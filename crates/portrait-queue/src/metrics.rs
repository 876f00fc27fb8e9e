//! Queue client metrics.
//!
//! - Request counters by operation and status
//! - Latency histograms
//! - Probe outcomes

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total queue requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "portrait_queue_requests_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "portrait_queue_latency_seconds";

    /// Existence probes by outcome.
    pub const PROBES_TOTAL: &str = "portrait_probes_total";
}

/// Record metrics for a completed queue request.
///
/// `status` is 0 when no response was received.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record the outcome of an existence probe.
pub fn record_probe(playable: bool) {
    counter!(
        names::PROBES_TOTAL,
        "outcome" => if playable { "available" } else { "unavailable" }
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::REQUESTS_TOTAL.contains("requests"));
        assert!(names::LATENCY_SECONDS.contains("latency"));
        assert!(names::PROBES_TOTAL.contains("probes"));
    }
}
