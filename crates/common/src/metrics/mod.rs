//! Metrics and observability utilities
//!
//! Prometheus-style metrics for the answer pipeline with standardized
//! naming conventions.

use crate::errors::ErrorKind;
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all service metrics
pub const METRICS_PREFIX: &str = "saathi";

/// Buckets for end-to-end answer latency (dominated by the provider call)
pub const ANSWER_BUCKETS: &[f64] = &[
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    4.000,  // 4s
    8.000,  // 8s
    15.00,  // 15s
    25.00,  // 25s - generation timeout
    30.00,  // 30s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_ai_search_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total AI search requests by outcome"
    );

    describe_histogram!(
        format!("{}_ai_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end AI search latency in seconds"
    );

    describe_histogram!(
        format!("{}_retrieval_candidates", METRICS_PREFIX),
        Unit::Count,
        "Candidates per lookup and after merging"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Completion provider latency in seconds"
    );

    describe_counter!(
        format!("{}_generation_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total completion provider errors"
    );

    describe_counter!(
        format!("{}_rate_limited_total", METRICS_PREFIX),
        Unit::Count,
        "Requests rejected by the rate limiter"
    );

    tracing::info!("Metrics registered");
}

/// Record the outcome of one AI search request
pub fn record_ai_search(duration_secs: f64, failure: Option<ErrorKind>) {
    let outcome = if failure.is_some() { "error" } else { "success" };
    let kind = failure.map(|k| k.as_str()).unwrap_or("none");

    counter!(
        format!("{}_ai_search_requests_total", METRICS_PREFIX),
        "outcome" => outcome,
        "kind" => kind
    )
    .increment(1);

    histogram!(
        format!("{}_ai_search_duration_seconds", METRICS_PREFIX),
        "outcome" => outcome
    )
    .record(duration_secs);
}

/// Record candidate counts for each lookup and the merged set
pub fn record_candidates(primary: usize, secondary: usize, merged: usize) {
    for (stage, count) in [("primary", primary), ("secondary", secondary), ("merged", merged)] {
        histogram!(
            format!("{}_retrieval_candidates", METRICS_PREFIX),
            "stage" => stage
        )
        .record(count as f64);
    }
}

/// Record a provider call
pub fn record_generation(duration_secs: f64, model: &str, success: bool) {
    if success {
        histogram!(
            format!("{}_generation_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_generation_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(1);
    }
}

/// Record a request turned away by the rate limiter
pub fn record_rate_limited() {
    counter!(format!("{}_rate_limited_total", METRICS_PREFIX)).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in ANSWER_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
        assert!(ANSWER_BUCKETS.contains(&25.00));
    }

    #[test]
    fn test_recording_without_recorder() {
        // No global recorder installed: calls are no-ops
        register_metrics();
        record_ai_search(0.2, None);
        record_ai_search(0.1, Some(ErrorKind::Validation));
        record_candidates(10, 5, 12);
        record_generation(1.5, "gpt-4o-mini", true);
        record_rate_limited();
    }
}
