// Model name resolution (inbound aliases → Gemini model names)

use crate::error::{GatewayError, Result};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Lazily initialized alias map.
static MODEL_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

fn get_model_map() -> &'static HashMap<&'static str, &'static str> {
    MODEL_MAP.get_or_init(|| {
        let mut m = HashMap::new();

        // Claude aliases
        m.insert("claude-opus-4", "gemini-2.5-pro");
        m.insert("claude-opus-4-5", "gemini-2.5-pro");
        m.insert("claude-sonnet-4", "gemini-2.5-flash");
        m.insert("claude-sonnet-4-5", "gemini-2.5-flash");
        m.insert("claude-haiku-4-5", "gemini-2.5-flash-lite");
        m.insert("claude-3-5-sonnet", "gemini-2.5-flash");
        m.insert("claude-3-opus", "gemini-2.5-pro");
        m.insert("claude-3-haiku", "gemini-2.5-flash-lite");

        // OpenAI aliases
        m.insert("gpt-4o", "gemini-2.5-pro");
        m.insert("gpt-4o-mini", "gemini-2.5-flash");
        m.insert("gpt-4-turbo", "gemini-2.5-pro");
        m.insert("gpt-4", "gemini-2.5-pro");
        m.insert("gpt-3.5-turbo", "gemini-2.5-flash-lite");

        m
    })
}

/// Resolve an inbound model name to the Gemini model the gateway will call.
///
/// Native Gemini names pass through untouched; Claude and OpenAI aliases are
/// looked up after stripping any date suffix.
pub fn resolve_model(inbound: &str) -> Result<String> {
    let inbound = inbound.strip_prefix("models/").unwrap_or(inbound);

    if inbound.starts_with("gemini-") {
        return Ok(inbound.to_string());
    }

    let normalized = strip_date_suffix(inbound);

    get_model_map()
        .get(normalized.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            GatewayError::Validation(format!(
                "model: unsupported model '{}'",
                inbound
            ))
        })
}

/// Strip date suffix from model names (e.g., "claude-sonnet-4-5-20250929").
fn strip_date_suffix(model: &str) -> String {
    // Date suffixes are 8 digits at the end: YYYYMMDD
    if model.len() > 9 && model.chars().nth(model.len() - 9) == Some('-') {
        let suffix = &model[model.len() - 8..];
        if suffix.chars().all(|c| c.is_ascii_digit()) {
            return model[..model.len() - 9].to_string();
        }
    }
    model.to_string()
}
