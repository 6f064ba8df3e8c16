// Error types for the gemgate gateway

mod envelope;

pub use envelope::{ErrorEnvelope, ErrorKind, ProtocolError};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("upstream API error (HTTP {status}): {message}")]
    UpstreamApi { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),
}

impl GatewayError {
    /// Classify an upstream HTTP failure into the gateway's error taxonomy.
    pub fn from_upstream_status(status: u16, message: String) -> Self {
        match status {
            400 | 404 => GatewayError::Validation(message),
            401 | 403 => GatewayError::Authentication(message),
            429 => GatewayError::RateLimit(message),
            500 | 502 | 503 | 504 => GatewayError::UpstreamApi { status, message },
            _ => GatewayError::Internal(format!("HTTP {}: {}", status, message)),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            GatewayError::Network(err.to_string())
        } else if let Some(status) = err.status() {
            GatewayError::from_upstream_status(status.as_u16(), err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
