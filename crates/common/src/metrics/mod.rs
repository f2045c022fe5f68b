//! Metrics and observability utilities
//!
//! Records engine runs through the `metrics` facade. Nothing is exported
//! unless the embedding service installs a recorder.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

use crate::config::PropagationMode;

/// Metrics prefix for all TrustGraph metrics
pub const METRICS_PREFIX: &str = "trustgraph";

/// Buckets for full recomputation latency (in seconds)
/// The decoupled engine is O(n^4), so the tail is long.
pub const COMPUTATION_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.010,  // 10ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.500,  // 500ms
    1.000,  // 1s
    5.000,  // 5s
    30.00,  // 30s
    120.0,  // 2m
    600.0,  // 10m
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_computations_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of trust score computations"
    );

    describe_histogram!(
        format!("{}_computation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Trust score computation latency in seconds"
    );

    describe_histogram!(
        format!("{}_computation_iterations", METRICS_PREFIX),
        Unit::Count,
        "Iterations used by a computation"
    );

    describe_gauge!(
        format!("{}_graph_vertices", METRICS_PREFIX),
        Unit::Count,
        "Vertices in the most recent graph snapshot"
    );

    describe_counter!(
        format!("{}_grant_allocations_total", METRICS_PREFIX),
        Unit::Count,
        "Total grant allocation runs"
    );

    describe_counter!(
        format!("{}_grant_over_allocation_total", METRICS_PREFIX),
        Unit::Count,
        "Grant runs whose floored recommendations exceed the budget"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record a trust computation
pub struct ComputationMetrics {
    start: Instant,
    mode: PropagationMode,
}

impl ComputationMetrics {
    /// Start tracking a computation
    pub fn start(mode: PropagationMode) -> Self {
        Self {
            start: Instant::now(),
            mode,
        }
    }

    /// Record computation completion
    pub fn finish(self, vertices: usize, iterations: usize, converged: bool) {
        let duration = self.start.elapsed().as_secs_f64();
        let mode = self.mode.as_str();

        counter!(
            format!("{}_computations_total", METRICS_PREFIX),
            "mode" => mode,
            "converged" => converged.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_computation_duration_seconds", METRICS_PREFIX),
            "mode" => mode
        )
        .record(duration);

        histogram!(
            format!("{}_computation_iterations", METRICS_PREFIX),
            "mode" => mode
        )
        .record(iterations as f64);

        gauge!(
            format!("{}_graph_vertices", METRICS_PREFIX),
            "mode" => mode
        )
        .set(vertices as f64);
    }
}

/// Helper to record grant allocation metrics
pub fn record_grant_allocation(duration_secs: f64, applicants: usize, over_allocated: bool) {
    counter!(format!("{}_grant_allocations_total", METRICS_PREFIX)).increment(1);

    if over_allocated {
        counter!(format!("{}_grant_over_allocation_total", METRICS_PREFIX)).increment(1);
    }

    histogram!(
        format!("{}_computation_duration_seconds", METRICS_PREFIX),
        "mode" => "grant"
    )
    .record(duration_secs);

    gauge!(
        format!("{}_graph_vertices", METRICS_PREFIX),
        "mode" => "grant"
    )
    .set(applicants as f64);
}
