// Metrics module for Prometheus observability

mod registry;

pub use registry::gather_metrics;
pub use registry::{
    KEY_POOL, KEY_SELECTIONS, REQUESTS_TOTAL, REQUEST_DURATION, SSE_EVENTS, TOKENS_TOTAL,
    TRANSLATION_ERRORS, UPSTREAM_CALLS, UPSTREAM_DURATION,
};

use crate::balancer::SelectionReason;
use crate::models::Protocol;

/// Record one completed inbound request.
pub fn record_request(
    protocol: Protocol,
    endpoint: &str,
    status_code: u16,
    model: &str,
    duration_secs: f64,
) {
    REQUESTS_TOTAL
        .with_label_values(&[protocol.as_str(), endpoint, &status_code.to_string(), model])
        .inc();

    REQUEST_DURATION
        .with_label_values(&[protocol.as_str(), endpoint, &status_code.to_string()])
        .observe(duration_secs);
}

/// Record one upstream Gemini call.
pub fn record_upstream_call(model: &str, status_code: u16, streaming: bool, duration_secs: f64) {
    UPSTREAM_CALLS
        .with_label_values(&[model, &status_code.to_string(), &streaming.to_string()])
        .inc();

    UPSTREAM_DURATION
        .with_label_values(&[model, &streaming.to_string()])
        .observe(duration_secs);
}

/// Record token usage.
pub fn record_tokens(model: &str, input: u32, output: u32) {
    if input > 0 {
        TOKENS_TOTAL
            .with_label_values(&[model, "input"])
            .inc_by(input as f64);
    }
    if output > 0 {
        TOKENS_TOTAL
            .with_label_values(&[model, "output"])
            .inc_by(output as f64);
    }
}

/// Record one key selection by reason.
pub fn record_selection(reason: SelectionReason) {
    KEY_SELECTIONS.with_label_values(&[reason.as_str()]).inc();
}

/// Update the key pool gauges.
pub fn update_key_pool(tracked: usize, healthy: usize) {
    KEY_POOL.with_label_values(&["tracked"]).set(tracked as f64);
    KEY_POOL.with_label_values(&["healthy"]).set(healthy as f64);
}

/// Record one outbound SSE event.
pub fn record_sse_event(protocol: Protocol) {
    SSE_EVENTS.with_label_values(&[protocol.as_str()]).inc();
}

/// Record a translation failure.
pub fn record_translation_error(protocol: Protocol, direction: &str) {
    TRANSLATION_ERRORS
        .with_label_values(&[protocol.as_str(), direction])
        .inc();
}
