pub mod metrics;
pub mod tracing;

use std::sync::Arc;

use anyhow::Result;
use prometheus::{Encoder, Registry, TextEncoder};

use self::metrics::Metrics;

/// Metrics registry plus the process-wide tracing subscriber.
#[derive(Debug, Clone)]
pub struct Telemetry {
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
}

impl Telemetry {
    /// Install tracing and register the metrics.
    ///
    /// # Errors
    /// Fails when the subscriber or a metric cannot be registered.
    pub fn new() -> Result<Self> {
        tracing::init()?;
        Self::metrics_only()
    }

    /// Register the metrics without touching the global subscriber.
    ///
    /// # Errors
    /// Fails when a metric cannot be registered.
    pub fn metrics_only() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(Metrics::new(Arc::clone(&registry))?);
        Ok(Self { registry, metrics })
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    #[must_use]
    pub fn metrics_arc(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub fn record_ready_probe(&self) {
        ::tracing::debug!("service ready probe");
    }

    pub fn record_live_probe(&self) {
        ::tracing::debug!("service live probe");
    }

    /// Text exposition of this registry.
    #[must_use]
    pub fn render_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(error) = encoder.encode(&metric_families, &mut buffer) {
            ::tracing::warn!(%error, "failed to encode prometheus metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_registered_metrics() {
        let telemetry = Telemetry::metrics_only().unwrap();
        telemetry.metrics().analyses_total.inc_by(2);

        let text = telemetry.render_prometheus();
        assert!(text.contains("# TYPE comment_analyses_total counter"));
        assert!(text.contains("comment_analyses_total 2"));
    }
}
