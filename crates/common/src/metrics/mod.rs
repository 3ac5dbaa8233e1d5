//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Workforce metrics
pub const METRICS_PREFIX: &str = "workforce";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 25ms, P99 < 100ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms - P50 target
    0.050,  // 50ms
    0.100,  // 100ms - P99 target
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Session metrics
    describe_counter!(
        format!("{}_sessions_created_total", METRICS_PREFIX),
        Unit::Count,
        "Sessions issued after a successful login"
    );

    describe_counter!(
        format!("{}_login_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Rejected login attempts"
    );

    describe_counter!(
        format!("{}_session_validations_total", METRICS_PREFIX),
        Unit::Count,
        "Session validations by outcome"
    );

    describe_counter!(
        format!("{}_organization_switches_total", METRICS_PREFIX),
        Unit::Count,
        "Organization switch attempts by outcome"
    );

    describe_counter!(
        format!("{}_sessions_revoked_total", METRICS_PREFIX),
        Unit::Count,
        "Sessions removed by logout or account changes"
    );

    // Gate metrics
    describe_counter!(
        format!("{}_gate_rejections_total", METRICS_PREFIX),
        Unit::Count,
        "Protected requests rejected for a missing token"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record a login attempt
pub fn record_login(success: bool, kind: &str) {
    if success {
        counter!(
            format!("{}_sessions_created_total", METRICS_PREFIX),
            "kind" => kind.to_string()
        )
        .increment(1);
    } else {
        counter!(format!("{}_login_failures_total", METRICS_PREFIX)).increment(1);
    }
}

/// Record the outcome of a session validation
pub fn record_validation(outcome: &'static str) {
    counter!(
        format!("{}_session_validations_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record an organization switch attempt
pub fn record_switch(success: bool) {
    let outcome = if success { "success" } else { "denied" };
    counter!(
        format!("{}_organization_switches_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record revoked sessions
pub fn record_revocations(count: u64) {
    counter!(format!("{}_sessions_revoked_total", METRICS_PREFIX)).increment(count);
}

/// Record a request stopped at the session gate
pub fn record_gate_rejection() {
    counter!(format!("{}_gate_rejections_total", METRICS_PREFIX)).increment(1);
}
