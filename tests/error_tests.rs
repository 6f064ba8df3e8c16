// Error translation and masking tests

use gemgate::error::{ErrorEnvelope, ErrorKind, GatewayError};
use gemgate::models::Protocol;
use gemgate::utils::masking::mask_key;

#[test]
fn test_mapping_table() {
    // status → (kind, retryable, rotate)
    let table: &[(u16, ErrorKind, bool, bool)] = &[
        (400, ErrorKind::Validation, false, false),
        (401, ErrorKind::Authentication, false, true),
        (403, ErrorKind::Authentication, false, true),
        (404, ErrorKind::Validation, false, false),
        (429, ErrorKind::RateLimit, true, true),
        (500, ErrorKind::UpstreamApi, true, false),
        (502, ErrorKind::UpstreamApi, true, false),
        (503, ErrorKind::UpstreamApi, true, false),
        (504, ErrorKind::UpstreamApi, true, false),
        (418, ErrorKind::Internal, false, false),
    ];

    for (status, kind, retryable, rotate) in table {
        let env = ErrorEnvelope::from_upstream_status(*status, "x".to_string());
        assert_eq!(env.kind, *kind, "status {}", status);
        assert_eq!(env.retryable, *retryable, "status {}", status);
        assert_eq!(env.should_rotate_key, *rotate, "status {}", status);
    }
}

#[test]
fn test_rate_limit_scenario() {
    // Upstream 429 → RateLimit, retryable, rotate.
    let env = ErrorEnvelope::from_upstream_status(429, "quota exceeded".to_string());
    assert_eq!(env.kind, ErrorKind::RateLimit);
    assert_eq!(env.http_status, 429);
    assert!(env.retryable);
    assert!(env.should_rotate_key);
}

#[test]
fn test_network_errors_are_retryable_without_rotation() {
    let env = ErrorEnvelope::network("connection timed out");
    assert_eq!(env.kind, ErrorKind::Network);
    assert!(env.retryable);
    assert!(!env.should_rotate_key);
    assert!(env.counts_against_key());
}

#[test]
fn test_validation_never_counts_against_key() {
    let env = ErrorEnvelope::from_error(&GatewayError::Validation("bad".to_string()));
    assert!(!env.counts_against_key());
    assert_eq!(env.http_status, 400);
}

#[test]
fn test_error_rendered_in_caller_protocol() {
    let env = ErrorEnvelope::from_upstream_status(429, "slow down".to_string());

    let openai = env.to_protocol_json(Protocol::OpenAi);
    assert_eq!(openai["error"]["type"], "rate_limit_error");
    assert!(openai.get("type").is_none());

    let claude = env.to_protocol_json(Protocol::Claude);
    assert_eq!(claude["type"], "error");
    assert_eq!(claude["error"]["type"], "rate_limit_error");

    let gemini = env.to_protocol_json(Protocol::Gemini);
    assert_eq!(gemini["error"]["status"], "RESOURCE_EXHAUSTED");
    assert_eq!(gemini["error"]["code"], 429);
}

#[test]
fn test_gateway_error_display_messages() {
    let errors = vec![
        GatewayError::Validation("bad field".to_string()),
        GatewayError::Authentication("bad key".to_string()),
        GatewayError::RateLimit("quota".to_string()),
        GatewayError::Network("timeout".to_string()),
        GatewayError::Translation("shape mismatch".to_string()),
        GatewayError::Internal("oops".to_string()),
        GatewayError::UpstreamApi {
            status: 503,
            message: "down".to_string(),
        },
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty(), "error should have a display message");
    }
}

#[test]
fn test_validation_error_preserves_field_path() {
    let error = GatewayError::Validation("messages[2].role: roles must alternate".to_string());
    let env = ErrorEnvelope::from_error(&error);
    assert!(env.message.contains("messages[2].role"));

    let body = env.to_protocol_json(Protocol::Claude);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("messages[2].role"));
}

#[test]
fn test_key_masking_shape() {
    let masked = mask_key("AIzaSyC9h2kQxPm4vWn8Jd");
    assert!(masked.starts_with("AIza"));
    assert!(masked.ends_with("n8Jd"));
    assert!(masked.contains("************"));
    assert!(!masked.contains("C9h2kQxPm4vW"));
}

#[test]
fn test_upstream_status_classification() {
    assert!(matches!(
        GatewayError::from_upstream_status(401, "no".to_string()),
        GatewayError::Authentication(_)
    ));
    assert!(matches!(
        GatewayError::from_upstream_status(404, "no".to_string()),
        GatewayError::Validation(_)
    ));
    assert!(matches!(
        GatewayError::from_upstream_status(429, "no".to_string()),
        GatewayError::RateLimit(_)
    ));
    assert!(matches!(
        GatewayError::from_upstream_status(502, "no".to_string()),
        GatewayError::UpstreamApi { status: 502, .. }
    ));
}
