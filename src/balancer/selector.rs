// Health- and performance-aware key selection.

use super::key::ApiKey;
use super::metrics::{KeyMetrics, KeySummary};
use crate::config::BalancerConfig;
use crate::error::{GatewayError, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Why a particular key was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    SingleKey,
    PerformanceOptimized,
    LeastBadFallback,
}

impl SelectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionReason::SingleKey => "single_key",
            SelectionReason::PerformanceOptimized => "performance_optimized",
            SelectionReason::LeastBadFallback => "least_bad_fallback",
        }
    }
}

/// The outcome of one selection.
#[derive(Debug, Clone)]
pub struct Selection {
    pub key: ApiKey,
    pub reason: SelectionReason,
    pub available_count: usize,
    pub healthy_count: usize,
}

/// Load balancer over caller-submitted credentials.
///
/// The per-key metrics map is the only state shared across concurrent
/// requests. Critical sections are short and never hold the lock across an
/// await point.
pub struct KeySelector {
    config: BalancerConfig,
    metrics: RwLock<HashMap<String, KeyMetrics>>,
}

impl KeySelector {
    pub fn new(config: BalancerConfig) -> Self {
        Self {
            config,
            metrics: RwLock::new(HashMap::new()),
        }
    }

    /// Choose one key out of the caller's candidates.
    ///
    /// A single candidate is returned immediately regardless of its health:
    /// there is no alternative to rotate to. With several candidates the
    /// healthy ones are scored and the best wins; if none are healthy the
    /// least-bad one is returned rather than failing closed.
    pub fn select(&self, candidates: &[ApiKey]) -> Result<Selection> {
        if candidates.is_empty() {
            return Err(GatewayError::Authentication(
                "no API key provided".to_string(),
            ));
        }

        let available_count = candidates.len();

        let map = self.metrics.read();

        let healthy_count = candidates
            .iter()
            .filter(|key| self.is_healthy(map.get(&key.hashed())))
            .count();

        if candidates.len() == 1 {
            return Ok(Selection {
                key: candidates[0].clone(),
                reason: SelectionReason::SingleKey,
                available_count,
                healthy_count,
            });
        }

        let (pool, reason): (Vec<&ApiKey>, SelectionReason) = if healthy_count > 0 {
            (
                candidates
                    .iter()
                    .filter(|key| self.is_healthy(map.get(&key.hashed())))
                    .collect(),
                SelectionReason::PerformanceOptimized,
            )
        } else {
            warn!(
                candidates = available_count,
                "no healthy key among candidates, falling back to least-bad"
            );
            (candidates.iter().collect(), SelectionReason::LeastBadFallback)
        };

        let best = pool
            .iter()
            .max_by(|a, b| {
                let score_a = self.score(map.get(&a.hashed()));
                let score_b = self.score(map.get(&b.hashed()));
                score_a
                    .partial_cmp(&score_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .copied()
            .ok_or_else(|| GatewayError::Internal("empty selection pool".to_string()))?;

        debug!(
            key = %best.masked(),
            reason = reason.as_str(),
            healthy = healthy_count,
            available = available_count,
            "selected key"
        );

        Ok(Selection {
            key: best.clone(),
            reason,
            available_count,
            healthy_count,
        })
    }

    /// Record the outcome of one upstream call attempt for a credential.
    pub fn record_outcome(&self, key: &ApiKey, latency: Duration, success: bool) {
        let hashed = key.hashed();
        let mut map = self.metrics.write();
        let entry = map.entry(hashed).or_default();

        if success {
            entry.success_count += 1;
            entry.consecutive_failures = 0;
        } else {
            entry.error_count += 1;
            entry.consecutive_failures += 1;
        }

        entry.observe_latency(latency.as_secs_f64() * 1000.0, self.config.latency_smoothing);
        entry.last_used = Instant::now();
        entry.is_healthy = self.evaluate_health(entry);

        if !entry.is_healthy {
            warn!(
                key = %key.masked(),
                consecutive_failures = entry.consecutive_failures,
                "key marked unhealthy"
            );
        }
    }

    /// Drop entries idle for longer than twice the performance window.
    pub fn prune(&self) {
        let horizon = Duration::from_secs(self.config.performance_window_seconds) * 2;
        let mut map = self.metrics.write();
        let before = map.len();
        map.retain(|_, metrics| metrics.last_used.elapsed() <= horizon);
        let removed = before - map.len();
        if removed > 0 {
            debug!(removed, "pruned idle key metrics");
        }
    }

    /// Serializable snapshot for the health endpoint.
    pub fn snapshot(&self) -> Vec<KeySummary> {
        let map = self.metrics.read();
        map.iter()
            .map(|(hashed, m)| KeySummary {
                hashed_key: hashed.chars().take(12).collect(),
                is_healthy: m.is_healthy,
                success_count: m.success_count,
                error_count: m.error_count,
                consecutive_failures: m.consecutive_failures,
                avg_latency_ms: m.avg_latency_ms,
            })
            .collect()
    }

    /// Number of credentials currently tracked.
    pub fn tracked_count(&self) -> usize {
        self.metrics.read().len()
    }

    /// Full state for one credential, if it has been seen.
    pub fn metrics_for(&self, key: &ApiKey) -> Option<KeyMetrics> {
        self.metrics.read().get(&key.hashed()).cloned()
    }

    /// Keys never seen before default to healthy: no data is not bad data.
    fn is_healthy(&self, metrics: Option<&KeyMetrics>) -> bool {
        metrics.map(|m| m.is_healthy).unwrap_or(true)
    }

    fn evaluate_health(&self, metrics: &KeyMetrics) -> bool {
        if metrics.consecutive_failures >= self.config.max_consecutive_errors {
            return false;
        }
        if metrics.total() >= self.config.min_samples
            && metrics.success_rate() < self.config.unhealthy_threshold
        {
            return false;
        }
        true
    }

    /// Composite score: weighted success rate, weighted latency position,
    /// minus a capped consecutive-failure penalty.
    fn score(&self, metrics: Option<&KeyMetrics>) -> f64 {
        let Some(m) = metrics else {
            // Never-seen key: neutral on both axes.
            return 0.5 * self.config.success_rate_weight
                + 0.5 * self.config.response_time_weight;
        };

        let success_rate = if m.total() < self.config.min_samples {
            // Not enough data is not the same as known bad.
            0.5
        } else {
            m.success_rate()
        };

        let response_time_score = if m.total() == 0 {
            0.5
        } else {
            self.latency_score(m.avg_latency_ms)
        };

        let penalty = (m.consecutive_failures as f64 * 0.1).min(0.5);

        success_rate * self.config.success_rate_weight
            + response_time_score * self.config.response_time_weight
            - penalty
    }

    /// Map average latency linearly onto [0, 1] between the configured
    /// floor (excellent) and ceiling (worst).
    fn latency_score(&self, avg_ms: f64) -> f64 {
        let floor = self.config.latency_floor_ms;
        let ceiling = self.config.latency_ceiling_ms;
        if avg_ms <= floor {
            return 1.0;
        }
        if avg_ms >= ceiling {
            return 0.0;
        }
        1.0 - (avg_ms - floor) / (ceiling - floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector() -> KeySelector {
        KeySelector::new(BalancerConfig::default())
    }

    #[test]
    fn test_latency_score_bounds() {
        let s = selector();
        assert_eq!(s.latency_score(50.0), 1.0);
        assert_eq!(s.latency_score(100.0), 1.0);
        assert_eq!(s.latency_score(5000.0), 0.0);
        assert_eq!(s.latency_score(9999.0), 0.0);
        let mid = s.latency_score(2550.0);
        assert!(mid > 0.49 && mid < 0.51);
    }

    #[test]
    fn test_unseen_key_scores_neutral() {
        let s = selector();
        let score = s.score(None);
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_penalty_is_capped() {
        let s = selector();
        let mut m = KeyMetrics::new();
        m.error_count = 20;
        m.consecutive_failures = 20;
        m.avg_latency_ms = 100.0;
        // Penalty caps at 0.5, so the score cannot sink without bound.
        let score = s.score(Some(&m));
        let mut m2 = m.clone();
        m2.consecutive_failures = 50;
        assert_eq!(score, s.score(Some(&m2)));
    }

    #[test]
    fn test_small_sample_uses_neutral_success_rate() {
        let s = selector();
        let mut m = KeyMetrics::new();
        m.error_count = 2;
        m.consecutive_failures = 0;
        m.avg_latency_ms = 100.0;
        // 2 samples < min_samples, so success_rate contributes 0.5 not 0.0.
        let score = s.score(Some(&m));
        assert!(score > 0.5);
    }
}
