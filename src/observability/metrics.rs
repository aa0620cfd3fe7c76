//! Prometheus metric definitions.
use std::sync::Arc;

use prometheus::{
    Histogram, IntCounter, IntCounterVec, Registry, register_histogram_with_registry,
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
};

/// Metric collectors for the analysis pipeline.
#[derive(Debug, Clone)]
pub struct Metrics {
    // counters
    pub analyses_total: IntCounter,
    pub analysis_failures: IntCounterVec,
    pub comments_classified: IntCounter,
    pub comments_flagged: IntCounter,

    // histograms
    pub fetch_duration: Histogram,
    pub prediction_duration: Histogram,
}

impl Metrics {
    /// Register every collector with `registry`.
    ///
    /// # Errors
    /// Fails when a metric with the same name is already registered.
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            analyses_total: register_int_counter_with_registry!(
                "comment_analyses_total",
                "Total number of comment analysis requests",
                registry
            )?,
            analysis_failures: register_int_counter_vec_with_registry!(
                "comment_analysis_failures_total",
                "Total number of failed comment analyses by error kind",
                &["kind"],
                registry
            )?,
            comments_classified: register_int_counter_with_registry!(
                "comments_classified_total",
                "Total number of comments classified",
                registry
            )?,
            comments_flagged: register_int_counter_with_registry!(
                "comments_flagged_misinformation_total",
                "Total number of comments classified as misinformation",
                registry
            )?,
            fetch_duration: register_histogram_with_registry!(
                "comment_fetch_duration_seconds",
                "Time spent retrieving comments from their source",
                registry
            )?,
            prediction_duration: register_histogram_with_registry!(
                "comment_prediction_duration_seconds",
                "Time spent scoring a comment batch",
                registry
            )?,
        })
    }

    pub fn record_failure(&self, kind: &str) {
        self.analysis_failures.with_label_values(&[kind]).inc();
    }
}

#[cfg(test)]
mod tests {
    use prometheus::{Encoder, TextEncoder};

    use super::*;

    #[test]
    fn registers_all_collectors() {
        let registry = Arc::new(Registry::new());
        let metrics = Metrics::new(Arc::clone(&registry)).unwrap();

        metrics.analyses_total.inc();
        metrics.record_failure("InvalidSource");
        metrics.fetch_duration.observe(0.2);

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("comment_analyses_total 1"));
        assert!(text.contains("comment_analysis_failures_total{kind=\"InvalidSource\"} 1"));
        assert!(text.contains("comment_fetch_duration_seconds_count 1"));
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = Arc::new(Registry::new());
        Metrics::new(Arc::clone(&registry)).unwrap();
        assert!(Metrics::new(registry).is_err());
    }
}
