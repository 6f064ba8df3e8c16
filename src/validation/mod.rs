//! Inbound request validation.
//!
//! Every protocol's body is checked before transformation and before any
//! upstream call is attempted, so a bad request never burns a credential.
//! Violations carry the offending field path verbatim in the message.

use crate::error::{GatewayError, Result};
use crate::models::claude::MessagesRequest;
use crate::models::gemini::GenerateContentRequest;
use crate::models::openai::ChatCompletionRequest;

const CLAUDE_MAX_TOKENS_CEILING: u32 = 8192;
const CLAUDE_MAX_STOP_SEQUENCES: usize = 4;
const CLAUDE_MAX_STOP_SEQUENCE_LEN: usize = 64;
const CLAUDE_MAX_SYSTEM_LEN: usize = 32_000;
const CLAUDE_MAX_TOOLS: usize = 128;
const CLAUDE_MAX_TOOL_NAME_LEN: usize = 64;

fn invalid(path: &str, problem: impl AsRef<str>) -> GatewayError {
    GatewayError::Validation(format!("{}: {}", path, problem.as_ref()))
}

/// Validate an Anthropic Messages request.
///
/// Claude conversations alternate strictly between user and assistant,
/// starting and ending on user.
pub fn validate_claude(req: &MessagesRequest) -> Result<()> {
    if req.messages.is_empty() {
        return Err(invalid("messages", "must not be empty"));
    }

    for (i, msg) in req.messages.iter().enumerate() {
        match msg.role.as_str() {
            "user" | "assistant" => {}
            other => {
                return Err(invalid(
                    &format!("messages[{}].role", i),
                    format!("invalid role '{}', must be 'user' or 'assistant'", other),
                ))
            }
        }
        if i > 0 && msg.role == req.messages[i - 1].role {
            return Err(invalid(
                &format!("messages[{}].role", i),
                "roles must alternate between user and assistant",
            ));
        }
    }

    if req.messages[0].role != "user" {
        return Err(invalid("messages[0].role", "first message must be from user"));
    }
    let last = req.messages.len() - 1;
    if req.messages[last].role != "user" {
        return Err(invalid(
            &format!("messages[{}].role", last),
            "last message must be from user",
        ));
    }

    if req.max_tokens < 1 || req.max_tokens > CLAUDE_MAX_TOKENS_CEILING {
        return Err(invalid(
            "max_tokens",
            format!("must be between 1 and {}", CLAUDE_MAX_TOKENS_CEILING),
        ));
    }

    if let Some(temperature) = req.temperature {
        if !(0.0..=1.0).contains(&temperature) {
            return Err(invalid("temperature", "must be between 0 and 1"));
        }
    }

    if let Some(top_k) = req.top_k {
        if !(1..=40).contains(&top_k) {
            return Err(invalid("top_k", "must be between 1 and 40"));
        }
    }

    if let Some(stop_sequences) = &req.stop_sequences {
        if stop_sequences.len() > CLAUDE_MAX_STOP_SEQUENCES {
            return Err(invalid(
                "stop_sequences",
                format!("at most {} entries allowed", CLAUDE_MAX_STOP_SEQUENCES),
            ));
        }
        for (i, seq) in stop_sequences.iter().enumerate() {
            let len = seq.chars().count();
            if len < 1 || len > CLAUDE_MAX_STOP_SEQUENCE_LEN {
                return Err(invalid(
                    &format!("stop_sequences[{}]", i),
                    format!("length must be between 1 and {}", CLAUDE_MAX_STOP_SEQUENCE_LEN),
                ));
            }
        }
    }

    if let Some(system) = &req.system {
        if system.to_text().chars().count() > CLAUDE_MAX_SYSTEM_LEN {
            return Err(invalid(
                "system",
                format!("length must not exceed {}", CLAUDE_MAX_SYSTEM_LEN),
            ));
        }
    }

    if let Some(tools) = &req.tools {
        if tools.len() > CLAUDE_MAX_TOOLS {
            return Err(invalid(
                "tools",
                format!("at most {} tools allowed", CLAUDE_MAX_TOOLS),
            ));
        }
        for (i, tool) in tools.iter().enumerate() {
            let len = tool.name.chars().count();
            if len < 1 || len > CLAUDE_MAX_TOOL_NAME_LEN {
                return Err(invalid(
                    &format!("tools[{}].name", i),
                    format!("length must be between 1 and {}", CLAUDE_MAX_TOOL_NAME_LEN),
                ));
            }
        }
    }

    Ok(())
}

/// Validate an OpenAI chat-completions request.
///
/// OpenAI does not require role alternation; system messages may appear
/// anywhere and are extracted before translation.
pub fn validate_openai(req: &ChatCompletionRequest) -> Result<()> {
    if req.messages.is_empty() {
        return Err(invalid("messages", "must not be empty"));
    }

    for (i, msg) in req.messages.iter().enumerate() {
        match msg.role.as_str() {
            "system" | "developer" | "user" | "assistant" | "tool" => {}
            other => {
                return Err(invalid(
                    &format!("messages[{}].role", i),
                    format!("invalid role '{}'", other),
                ))
            }
        }
        if msg.role == "tool" && msg.tool_call_id.is_none() {
            return Err(invalid(
                &format!("messages[{}].tool_call_id", i),
                "required for tool messages",
            ));
        }
    }

    if let Some(temperature) = req.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(invalid("temperature", "must be between 0 and 2"));
        }
    }

    if let Some(top_p) = req.top_p {
        if !(0.0..=1.0).contains(&top_p) {
            return Err(invalid("top_p", "must be between 0 and 1"));
        }
    }

    if let Some(max_tokens) = req.max_tokens {
        if max_tokens < 1 {
            return Err(invalid("max_tokens", "must be at least 1"));
        }
    }

    if let Some(n) = req.n {
        if !(1..=8).contains(&n) {
            return Err(invalid("n", "must be between 1 and 8"));
        }
    }

    if let Some(stop) = &req.stop {
        if stop.len() > 4 {
            return Err(invalid("stop", "at most 4 sequences allowed"));
        }
    }

    Ok(())
}

/// Validate a native Gemini generateContent request.
pub fn validate_gemini(req: &GenerateContentRequest) -> Result<()> {
    if req.contents.is_empty() {
        return Err(invalid("contents", "must not be empty"));
    }

    for (i, content) in req.contents.iter().enumerate() {
        match content.role.as_str() {
            "user" | "model" => {}
            other => {
                return Err(invalid(
                    &format!("contents[{}].role", i),
                    format!("invalid role '{}', must be 'user' or 'model'", other),
                ))
            }
        }
        if content.parts.is_empty() {
            return Err(invalid(
                &format!("contents[{}].parts", i),
                "must not be empty",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::claude::{Message, MessageContent};

    fn claude_request(roles: &[&str]) -> MessagesRequest {
        MessagesRequest {
            model: "claude-sonnet-4-5".to_string(),
            messages: roles
                .iter()
                .map(|role| Message {
                    role: role.to_string(),
                    content: MessageContent::Text("hi".to_string()),
                })
                .collect(),
            system: None,
            max_tokens: 100,
            temperature: None,
            top_p: None,
            top_k: None,
            stop_sequences: None,
            tools: None,
            thinking: None,
            stream: None,
        }
    }

    #[test]
    fn test_alternation_accepted() {
        assert!(validate_claude(&claude_request(&["user"])).is_ok());
        assert!(validate_claude(&claude_request(&["user", "assistant", "user"])).is_ok());
    }

    #[test]
    fn test_consecutive_roles_rejected() {
        let err = validate_claude(&claude_request(&["user", "user"])).unwrap_err();
        assert!(err.to_string().contains("messages[1].role"));
    }

    #[test]
    fn test_first_and_last_must_be_user() {
        assert!(validate_claude(&claude_request(&["assistant", "user"])).is_err());
        assert!(validate_claude(&claude_request(&["user", "assistant"])).is_err());
    }

    #[test]
    fn test_empty_messages_rejected() {
        let err = validate_claude(&claude_request(&[])).unwrap_err();
        assert!(err.to_string().contains("messages"));
    }

    #[test]
    fn test_max_tokens_range() {
        let mut req = claude_request(&["user"]);
        req.max_tokens = 0;
        assert!(validate_claude(&req).is_err());
        req.max_tokens = 8193;
        assert!(validate_claude(&req).is_err());
        req.max_tokens = 8192;
        assert!(validate_claude(&req).is_ok());
    }

    #[test]
    fn test_temperature_range() {
        let mut req = claude_request(&["user"]);
        req.temperature = Some(1.5);
        let err = validate_claude(&req).unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_stop_sequence_limits() {
        let mut req = claude_request(&["user"]);
        req.stop_sequences = Some(vec!["a".to_string(); 5]);
        assert!(validate_claude(&req).is_err());

        req.stop_sequences = Some(vec!["".to_string()]);
        let err = validate_claude(&req).unwrap_err();
        assert!(err.to_string().contains("stop_sequences[0]"));
    }

    #[test]
    fn test_top_k_range() {
        let mut req = claude_request(&["user"]);
        req.top_k = Some(41);
        assert!(validate_claude(&req).is_err());
        req.top_k = Some(40);
        assert!(validate_claude(&req).is_ok());
    }
}
