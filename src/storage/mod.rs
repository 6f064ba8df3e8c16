//! Narrow persistence interface for request logs and key metrics history.
//!
//! The relational store behind this interface is an external collaborator;
//! the gateway only appends request logs and upserts per-key aggregates.
//! Both operations are fire-and-forget: implementations must not block the
//! request path, and their failure must never fail the caller's request.
//! Only hashed key identities cross this boundary, never raw material.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// One request-log append.
#[derive(Debug, Clone, Serialize)]
pub struct RequestLogEntry {
    pub hashed_key: String,
    pub model: String,
    pub endpoint: String,
    pub status_code: u16,
    pub latency_ms: u64,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub is_stream: bool,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate delta for one credential.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MetricsDelta {
    pub success: u64,
    pub failure: u64,
    pub latency_ms: u64,
}

/// The persistence surface the core is allowed to touch.
pub trait RequestStore: Send + Sync {
    fn log_request(&self, entry: RequestLogEntry);
    fn update_key_metrics(&self, hashed_key: &str, delta: MetricsDelta);
}

/// Default store: structured log lines only. Stands in for the relational
/// backend in development and tests.
pub struct TracingStore;

impl RequestStore for TracingStore {
    fn log_request(&self, entry: RequestLogEntry) {
        debug!(
            hashed_key = %entry.hashed_key.chars().take(12).collect::<String>(),
            model = %entry.model,
            endpoint = %entry.endpoint,
            status = entry.status_code,
            latency_ms = entry.latency_ms,
            is_stream = entry.is_stream,
            "request logged"
        );
    }

    fn update_key_metrics(&self, hashed_key: &str, delta: MetricsDelta) {
        debug!(
            hashed_key = %hashed_key.chars().take(12).collect::<String>(),
            success = delta.success,
            failure = delta.failure,
            latency_ms = delta.latency_ms,
            "key metrics delta"
        );
    }
}

/// Shared handle used by request handlers.
pub type SharedStore = Arc<dyn RequestStore>;
