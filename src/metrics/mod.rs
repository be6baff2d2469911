use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::{Arc, OnceLock};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Prometheus-backed metrics for the foundation layers.
///
/// The recorder is installed once per process; every instance shares the same
/// underlying handle. Attach to a service with
/// [`crate::service::FoundationService::with_metrics`].
#[derive(Clone)]
pub struct FoundationMetrics {
    prometheus_handle: Arc<PrometheusHandle>,
}

impl FoundationMetrics {
    pub fn new() -> Self {
        Self::with_config(None)
    }

    pub fn with_config(config: Option<&crate::config::FoundationConfig>) -> Self {
        let handle = PROMETHEUS_HANDLE.get_or_init(|| {
            let builder = PrometheusBuilder::new();

            // Add global labels from config
            let builder = if let Some(cfg) = config {
                builder
                    .add_global_label("service", cfg.app.name.clone())
                    .add_global_label("version", cfg.app.version.clone())
                    .add_global_label("environment", cfg.app.environment.clone())
            } else {
                builder
            };

            let builder = builder
                .set_buckets_for_metric(
                    Matcher::Full("store_operations_duration_seconds".to_string()),
                    &[0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0],
                )
                .expect("Failed to set buckets for store_operations_duration_seconds");

            // Describe all metrics
            Self::describe_metrics();

            builder
                .install_recorder()
                .expect("Failed to install Prometheus recorder")
        });

        Self {
            prometheus_handle: Arc::new(handle.clone()),
        }
    }

    fn describe_metrics() {
        // Store metrics
        describe_counter!(
            "store_operations_total",
            "Total number of store operations by collection, operation and outcome"
        );
        describe_histogram!(
            "store_operations_duration_seconds",
            "Store operation duration in seconds"
        );

        // Circuit breaker metrics
        describe_counter!(
            "circuit_breaker_rejections_total",
            "Calls rejected by an open circuit breaker"
        );

        // Cache metrics
        describe_counter!("cache_hits_total", "Total number of cache hits");
        describe_counter!("cache_misses_total", "Total number of cache misses");
        describe_gauge!("cache_size", "Current number of items in cache");

        // Input screening metrics
        describe_counter!(
            "sanitization_rejections_total",
            "Inputs rejected by injection screening, by pattern"
        );
    }

    // Store metrics
    pub fn record_store_operation(
        &self,
        collection: &str,
        operation: &str,
        outcome: &str,
        duration_secs: f64,
    ) {
        counter!(
            "store_operations_total",
            "collection" => collection.to_string(),
            "operation" => operation.to_string(),
            "outcome" => outcome.to_string()
        )
        .increment(1);

        histogram!(
            "store_operations_duration_seconds",
            "collection" => collection.to_string(),
            "operation" => operation.to_string()
        )
        .record(duration_secs);
    }

    // Circuit breaker metrics
    pub fn record_circuit_rejection(&self, collection: &str) {
        counter!(
            "circuit_breaker_rejections_total",
            "collection" => collection.to_string()
        )
        .increment(1);
    }

    // Cache metrics
    pub fn record_cache_hit(&self) {
        counter!("cache_hits_total").increment(1);
    }

    pub fn record_cache_miss(&self) {
        counter!("cache_misses_total").increment(1);
    }

    pub fn set_cache_size(&self, size: usize) {
        gauge!("cache_size").set(size as f64);
    }

    // Input screening metrics
    pub fn record_sanitization_rejection(&self, pattern: &str) {
        counter!(
            "sanitization_rejections_total",
            "pattern" => pattern.to_string()
        )
        .increment(1);
    }

    // Prometheus export
    pub fn render(&self) -> String {
        self.prometheus_handle.render()
    }
}

impl Default for FoundationMetrics {
    fn default() -> Self {
        Self::new()
    }
}
