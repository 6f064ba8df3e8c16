// Upstream error translation into caller-protocol error vocabularies

use super::GatewayError;
use crate::models::Protocol;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{json, Value};

/// Gateway error taxonomy shared by all three inbound protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Authentication,
    Validation,
    RateLimit,
    UpstreamApi,
    Network,
    Internal,
}

/// One failure, classified once, then serialized into the caller's shape.
#[derive(Debug, Clone)]
pub struct ErrorEnvelope {
    pub kind: ErrorKind,
    pub http_status: u16,
    pub message: String,
    pub retryable: bool,
    pub should_rotate_key: bool,
}

impl ErrorEnvelope {
    /// Classify an upstream HTTP status per the gateway's mapping table.
    pub fn from_upstream_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 | 404 => Self {
                kind: ErrorKind::Validation,
                http_status: status,
                message,
                retryable: false,
                should_rotate_key: false,
            },
            401 | 403 => Self {
                kind: ErrorKind::Authentication,
                http_status: status,
                message,
                retryable: false,
                should_rotate_key: true,
            },
            429 => Self {
                kind: ErrorKind::RateLimit,
                http_status: 429,
                message,
                retryable: true,
                should_rotate_key: true,
            },
            500 | 502 | 503 | 504 => Self {
                kind: ErrorKind::UpstreamApi,
                http_status: status,
                message,
                retryable: true,
                should_rotate_key: false,
            },
            _ => Self {
                kind: ErrorKind::Internal,
                http_status: 500,
                message,
                retryable: false,
                should_rotate_key: false,
            },
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Network,
            http_status: 502,
            message: message.into(),
            retryable: true,
            should_rotate_key: false,
        }
    }

    pub fn from_error(err: &GatewayError) -> Self {
        match err {
            GatewayError::Validation(msg) => Self {
                kind: ErrorKind::Validation,
                http_status: 400,
                message: msg.clone(),
                retryable: false,
                should_rotate_key: false,
            },
            GatewayError::Authentication(msg) => Self {
                kind: ErrorKind::Authentication,
                http_status: 401,
                message: msg.clone(),
                retryable: false,
                should_rotate_key: true,
            },
            GatewayError::RateLimit(msg) => Self {
                kind: ErrorKind::RateLimit,
                http_status: 429,
                message: msg.clone(),
                retryable: true,
                should_rotate_key: true,
            },
            GatewayError::UpstreamApi { status, message } => {
                Self::from_upstream_status(*status, message.clone())
            }
            GatewayError::Network(msg) => Self::network(msg.clone()),
            other => Self {
                kind: ErrorKind::Internal,
                http_status: 500,
                message: other.to_string(),
                retryable: false,
                should_rotate_key: false,
            },
        }
    }

    /// True when the failure happened talking to the upstream and should be
    /// charged against the selected credential's metrics.
    pub fn counts_against_key(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Authentication
                | ErrorKind::RateLimit
                | ErrorKind::UpstreamApi
                | ErrorKind::Network
        )
    }

    /// Serialize into the error body of the given inbound protocol.
    pub fn to_protocol_json(&self, protocol: Protocol) -> Value {
        match protocol {
            Protocol::OpenAi => json!({
                "error": {
                    "message": self.message,
                    "type": self.openai_type(),
                    "param": Value::Null,
                    "code": Value::Null,
                }
            }),
            Protocol::Claude => json!({
                "type": "error",
                "error": {
                    "type": self.claude_type(),
                    "message": self.message,
                }
            }),
            Protocol::Gemini => json!({
                "error": {
                    "code": self.http_status,
                    "message": self.message,
                    "status": self.gemini_status(),
                }
            }),
        }
    }

    pub fn to_response(&self, protocol: Protocol) -> Response {
        let status =
            StatusCode::from_u16(self.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::Json(self.to_protocol_json(protocol))).into_response()
    }

    fn openai_type(&self) -> &'static str {
        match self.kind {
            ErrorKind::Validation => "invalid_request_error",
            ErrorKind::Authentication => "authentication_error",
            ErrorKind::RateLimit => "rate_limit_error",
            ErrorKind::UpstreamApi | ErrorKind::Network => "api_error",
            ErrorKind::Internal => "api_error",
        }
    }

    fn claude_type(&self) -> &'static str {
        match self.kind {
            ErrorKind::Validation => "invalid_request_error",
            ErrorKind::Authentication => "authentication_error",
            ErrorKind::RateLimit => "rate_limit_error",
            ErrorKind::UpstreamApi => {
                if self.http_status == 503 || self.http_status == 529 {
                    "overloaded_error"
                } else {
                    "api_error"
                }
            }
            ErrorKind::Network => "api_error",
            ErrorKind::Internal => "api_error",
        }
    }

    fn gemini_status(&self) -> &'static str {
        match self.kind {
            ErrorKind::Validation => {
                if self.http_status == 404 {
                    "NOT_FOUND"
                } else {
                    "INVALID_ARGUMENT"
                }
            }
            ErrorKind::Authentication => {
                if self.http_status == 403 {
                    "PERMISSION_DENIED"
                } else {
                    "UNAUTHENTICATED"
                }
            }
            ErrorKind::RateLimit => "RESOURCE_EXHAUSTED",
            ErrorKind::UpstreamApi => "UNAVAILABLE",
            ErrorKind::Network => "DEADLINE_EXCEEDED",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// A gateway failure bound to the protocol of the caller it will be shown to.
///
/// Handlers return this so that `?` renders errors in the caller's own error
/// vocabulary instead of a foreign shape.
#[derive(Debug)]
pub struct ProtocolError {
    pub protocol: Protocol,
    pub envelope: ErrorEnvelope,
}

impl ProtocolError {
    pub fn new(protocol: Protocol, err: GatewayError) -> Self {
        Self {
            protocol,
            envelope: ErrorEnvelope::from_error(&err),
        }
    }
}

impl IntoResponse for ProtocolError {
    fn into_response(self) -> Response {
        self.envelope.to_response(self.protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_envelope_is_retryable_and_rotates() {
        let env = ErrorEnvelope::from_upstream_status(429, "quota exceeded".to_string());
        assert_eq!(env.kind, ErrorKind::RateLimit);
        assert!(env.retryable);
        assert!(env.should_rotate_key);
    }

    #[test]
    fn auth_envelope_rotates_but_does_not_retry() {
        for status in [401, 403] {
            let env = ErrorEnvelope::from_upstream_status(status, "bad key".to_string());
            assert_eq!(env.kind, ErrorKind::Authentication);
            assert!(!env.retryable);
            assert!(env.should_rotate_key);
        }
    }

    #[test]
    fn server_errors_retry_without_rotation() {
        for status in [500, 502, 503, 504] {
            let env = ErrorEnvelope::from_upstream_status(status, "boom".to_string());
            assert_eq!(env.kind, ErrorKind::UpstreamApi);
            assert!(env.retryable);
            assert!(!env.should_rotate_key);
        }
    }

    #[test]
    fn openai_error_shape() {
        let env = ErrorEnvelope::from_error(&GatewayError::Validation("bad field".to_string()));
        let body = env.to_protocol_json(Protocol::OpenAi);
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert_eq!(body["error"]["message"], "bad field");
    }

    #[test]
    fn claude_error_shape() {
        let env = ErrorEnvelope::from_upstream_status(429, "slow down".to_string());
        let body = env.to_protocol_json(Protocol::Claude);
        assert_eq!(body["type"], "error");
        assert_eq!(body["error"]["type"], "rate_limit_error");
    }

    #[test]
    fn gemini_error_shape() {
        let env = ErrorEnvelope::from_upstream_status(403, "denied".to_string());
        let body = env.to_protocol_json(Protocol::Gemini);
        assert_eq!(body["error"]["status"], "PERMISSION_DENIED");
        assert_eq!(body["error"]["code"], 403);
    }
}
