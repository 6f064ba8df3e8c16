// Gemini-native passthrough

use crate::error::{GatewayError, Result};
use crate::models::gemini::GenerateContentRequest;
use serde_json::Value;

/// The request transform for the native protocol is the identity: the body
/// is deserialized (which drives validation) and forwarded unchanged.
pub fn transform_request(body: Value) -> Result<GenerateContentRequest> {
    serde_json::from_value(body)
        .map_err(|e| GatewayError::Validation(format!("request body: {}", e)))
}

/// Pass a Gemini response through after verifying its required top-level
/// field. A response with no `candidates` is a protocol error, not a silent
/// forward.
pub fn passthrough_response(body: Value) -> Result<Value> {
    if body.get("candidates").is_none() {
        return Err(GatewayError::Validation(
            "candidates: missing required field in upstream response".to_string(),
        ));
    }
    Ok(body)
}
