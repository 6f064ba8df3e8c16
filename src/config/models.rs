//! Configuration data structures for the gateway.
//!
//! Defines the schema for application settings: server parameters, upstream
//! Gemini API connection, load-balancer tuning, and logging.

use serde::{Deserialize, Serialize};

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port, workers).
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream Gemini API settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Key selector tuning.
    #[serde(default)]
    pub balancer: BalancerConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `8080`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads for the async runtime.
    /// Default: number of logical CPU cores.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Maximum accepted request body size in bytes.
    /// Default: `10 MiB`
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Settings for the upstream Gemini API connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL for the Gemini API.
    /// Default: Google's public generative language endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    /// Default: `300` (5 minutes)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connect timeout in seconds.
    /// Default: `10`
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Maximum attempts for non-streaming upstream calls (same key, same
    /// body; retried only on retryable statuses).
    /// Default: `3`
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum number of idle pooled connections per host.
    /// Default: `10`
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,
}

/// Tuning for the client-key load balancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancerConfig {
    /// Weight of the success-rate term in the composite score.
    /// Default: `0.6`
    #[serde(default = "default_success_rate_weight")]
    pub success_rate_weight: f64,

    /// Weight of the latency term in the composite score.
    /// Default: `0.4`
    #[serde(default = "default_response_time_weight")]
    pub response_time_weight: f64,

    /// Observations required before the measured success rate is trusted.
    /// Default: `5`
    #[serde(default = "default_min_samples")]
    pub min_samples: u64,

    /// Consecutive failures that mark a key unhealthy.
    /// Default: `3`
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,

    /// Success rate below which a sufficiently sampled key is unhealthy.
    /// Default: `0.3`
    #[serde(default = "default_unhealthy_threshold")]
    pub unhealthy_threshold: f64,

    /// Average latency treated as excellent, in milliseconds.
    /// Default: `100`
    #[serde(default = "default_latency_floor")]
    pub latency_floor_ms: f64,

    /// Average latency treated as worst-case, in milliseconds.
    /// Default: `5000`
    #[serde(default = "default_latency_ceiling")]
    pub latency_ceiling_ms: f64,

    /// Smoothing factor for the latency moving average.
    /// Default: `0.1`
    #[serde(default = "default_latency_smoothing")]
    pub latency_smoothing: f64,

    /// Performance window in seconds; metrics idle for twice this long
    /// are pruned.
    /// Default: `300`
    #[serde(default = "default_performance_window")]
    pub performance_window_seconds: u64,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            max_retries: default_max_retries(),
            pool_max_idle_per_host: default_pool_max_idle(),
        }
    }
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            success_rate_weight: default_success_rate_weight(),
            response_time_weight: default_response_time_weight(),
            min_samples: default_min_samples(),
            max_consecutive_errors: default_max_consecutive_errors(),
            unhealthy_threshold: default_unhealthy_threshold(),
            latency_floor_ms: default_latency_floor(),
            latency_ceiling_ms: default_latency_ceiling(),
            latency_smoothing: default_latency_smoothing(),
            performance_window_seconds: default_performance_window(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Helper functions for serde defaults

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout() -> u64 {
    300
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_pool_max_idle() -> usize {
    10
}

fn default_success_rate_weight() -> f64 {
    0.6
}

fn default_response_time_weight() -> f64 {
    0.4
}

fn default_min_samples() -> u64 {
    5
}

fn default_max_consecutive_errors() -> u32 {
    3
}

fn default_unhealthy_threshold() -> f64 {
    0.3
}

fn default_latency_floor() -> f64 {
    100.0
}

fn default_latency_ceiling() -> f64 {
    5000.0
}

fn default_latency_smoothing() -> f64 {
    0.1
}

fn default_performance_window() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
