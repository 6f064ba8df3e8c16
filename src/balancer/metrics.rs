// Per-credential rolling metrics.

use serde::Serialize;
use std::time::Instant;

/// Rolling state for one credential, kept for the lifetime of the process
/// (or until pruned after an inactivity window).
#[derive(Debug, Clone)]
pub struct KeyMetrics {
    pub success_count: u64,
    pub error_count: u64,
    pub consecutive_failures: u32,
    /// Exponentially smoothed average latency in milliseconds.
    pub avg_latency_ms: f64,
    pub is_healthy: bool,
    pub last_used: Instant,
}

impl KeyMetrics {
    pub fn new() -> Self {
        Self {
            success_count: 0,
            error_count: 0,
            consecutive_failures: 0,
            avg_latency_ms: 0.0,
            is_healthy: true,
            last_used: Instant::now(),
        }
    }

    pub fn total(&self) -> u64 {
        self.success_count + self.error_count
    }

    /// Raw success rate; callers decide how to treat small samples.
    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.success_count as f64 / total as f64
    }

    /// Fold one observed latency into the smoothed average.
    /// The very first observation is taken as-is.
    pub fn observe_latency(&mut self, sample_ms: f64, smoothing: f64) {
        if self.total() <= 1 {
            self.avg_latency_ms = sample_ms;
        } else {
            self.avg_latency_ms = self.avg_latency_ms * (1.0 - smoothing) + sample_ms * smoothing;
        }
    }
}

impl Default for KeyMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable view of one credential's state for the health endpoint.
/// Carries only the hashed identity, never key material.
#[derive(Debug, Clone, Serialize)]
pub struct KeySummary {
    pub hashed_key: String,
    pub is_healthy: bool,
    pub success_count: u64,
    pub error_count: u64,
    pub consecutive_failures: u32,
    pub avg_latency_ms: f64,
}
