//! Metrics collection for observability

use prometheus::{
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
    register_histogram_with_registry, CounterVec, Histogram, HistogramOpts, HistogramTimer,
    HistogramVec, Opts, Registry,
};
use std::sync::Arc;
use once_cell::sync::Lazy;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Pipeline outcomes
    pub verifications: CounterVec,
    pub stage_duration: HistogramVec,

    // Upstream calls
    pub oracle_requests: CounterVec,
    pub knowledge_requests: CounterVec,
    pub evidence_rows: Histogram,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Registry::new();

        let verifications = register_counter_vec_with_registry!(
            Opts::new("verifications_total", "Total verification runs by outcome"),
            &["outcome"],
            registry
        )?;

        let stage_duration = register_histogram_vec_with_registry!(
            "stage_duration_seconds",
            "Pipeline stage duration in seconds",
            &["stage"],
            registry
        )?;

        let oracle_requests = register_counter_vec_with_registry!(
            Opts::new("oracle_requests_total", "Total oracle completions"),
            &["stage", "status"],
            registry
        )?;

        let knowledge_requests = register_counter_vec_with_registry!(
            Opts::new("knowledge_requests_total", "Total knowledge endpoint queries"),
            &["status"],
            registry
        )?;

        let evidence_rows = register_histogram_with_registry!(
            HistogramOpts::new("evidence_rows", "Binding rows returned per query")
                .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 50.0, 100.0, 1000.0]),
            registry
        )?;

        Ok(Self {
            registry,
            verifications,
            stage_duration,
            oracle_requests,
            knowledge_requests,
            evidence_rows,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Start timing a pipeline stage; the duration is recorded on drop
    pub fn stage_timer(&self, stage: &str) -> HistogramTimer {
        self.stage_duration.with_label_values(&[stage]).start_timer()
    }

    /// Record a terminal outcome ("verified", "unverified", "no_evidence", ...)
    pub fn record_outcome(&self, outcome: &str) {
        self.verifications.with_label_values(&[outcome]).inc();
    }

    /// Record an oracle call
    pub fn record_oracle(&self, stage: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.oracle_requests.with_label_values(&[stage, status]).inc();
    }

    /// Record a knowledge endpoint call and, on success, its row count
    pub fn record_knowledge(&self, rows: Option<usize>) {
        match rows {
            Some(count) => {
                self.knowledge_requests.with_label_values(&["success"]).inc();
                self.evidence_rows.observe(count as f64);
            }
            None => {
                self.knowledge_requests.with_label_values(&["error"]).inc();
            }
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}
