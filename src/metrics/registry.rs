// Prometheus metrics registry and collectors

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec_with_registry, register_gauge_vec_with_registry,
    register_histogram_vec_with_registry, CounterVec, Encoder, GaugeVec, HistogramVec, Opts,
    Registry, TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ========================================================================
    // REQUEST METRICS
    // ========================================================================

    /// Total number of inbound API requests
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("requests_total", "Total number of inbound API requests"),
        &["protocol", "endpoint", "status_code", "model"],
        REGISTRY
    ).unwrap();

    /// Request duration histogram
    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("request_duration_seconds", "Request duration in seconds")
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["protocol", "endpoint", "status_code"],
        REGISTRY
    ).unwrap();

    // ========================================================================
    // UPSTREAM METRICS
    // ========================================================================

    /// Total upstream Gemini API calls
    pub static ref UPSTREAM_CALLS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("upstream_calls_total", "Total upstream Gemini API calls"),
        &["model", "status_code", "streaming"],
        REGISTRY
    ).unwrap();

    /// Upstream call duration
    pub static ref UPSTREAM_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("upstream_duration_seconds", "Upstream Gemini call duration")
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["model", "streaming"],
        REGISTRY
    ).unwrap();

    // ========================================================================
    // TOKEN METRICS
    // ========================================================================

    /// Total tokens processed
    pub static ref TOKENS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("tokens_total", "Total tokens processed"),
        &["model", "type"], // type: input, output
        REGISTRY
    ).unwrap();

    // ========================================================================
    // KEY SELECTOR METRICS
    // ========================================================================

    /// Key selections by reason
    pub static ref KEY_SELECTIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("key_selections_total", "Key selections by reason"),
        &["reason"], // reason: single_key, performance_optimized, least_bad_fallback
        REGISTRY
    ).unwrap();

    /// Current credential pool state
    pub static ref KEY_POOL: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("key_pool_current", "Current credential pool state"),
        &["state"], // state: tracked, healthy
        REGISTRY
    ).unwrap();

    // ========================================================================
    // STREAMING METRICS
    // ========================================================================

    /// Outbound SSE events by protocol
    pub static ref SSE_EVENTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("sse_events_total", "Total outbound SSE events"),
        &["protocol"],
        REGISTRY
    ).unwrap();

    // ========================================================================
    // TRANSLATION METRICS
    // ========================================================================

    /// Translation errors
    pub static ref TRANSLATION_ERRORS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("translation_errors_total", "Total translation errors"),
        &["protocol", "direction"], // direction: request, response, stream
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        REQUESTS_TOTAL
            .with_label_values(&["claude", "/v1/messages", "200", "gemini-2.5-flash"])
            .inc();
        KEY_SELECTIONS.with_label_values(&["single_key"]).inc();

        let metrics = gather_metrics();
        assert!(metrics.contains("requests_total"));
        assert!(metrics.contains("key_selections_total"));
    }
}
