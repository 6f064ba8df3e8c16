// OpenAI chat-completions ↔ Gemini translation

use crate::error::{GatewayError, Result};
use crate::models::gemini::{
    Content, FunctionCall, FunctionDeclaration, FunctionResponse, GenerateContentRequest,
    GenerateContentResponse, GenerationConfig, Part as GeminiPart, SystemInstruction,
    ToolDeclaration,
};
use crate::models::openai::{
    AssistantMessage, ChatCompletionRequest, ChatCompletionResponse, Choice, FunctionCallPayload,
    ToolCall, UsageInfo,
};
use crate::translation::tools::sanitize_schema;
use std::collections::HashMap;
use tracing::debug;

/// Translate an OpenAI chat-completions request into Gemini's native shape.
///
/// System (and developer) messages are extracted into `systemInstruction`
/// and removed from the content sequence.
pub fn transform_request(req: ChatCompletionRequest) -> Result<GenerateContentRequest> {
    debug!(model = %req.model, messages = req.messages.len(), "translating OpenAI request");

    let mut system_texts: Vec<String> = Vec::new();
    let mut contents: Vec<Content> = Vec::new();
    // tool call id → function name, for mapping role:"tool" messages
    let mut call_id_to_name: HashMap<String, String> = HashMap::new();

    for (i, msg) in req.messages.into_iter().enumerate() {
        match msg.role.as_str() {
            "system" | "developer" => {
                if let Some(content) = &msg.content {
                    system_texts.push(content.to_text());
                }
            }

            "user" => {
                let text = msg
                    .content
                    .as_ref()
                    .map(|c| c.to_text())
                    .unwrap_or_default();
                contents.push(Content {
                    role: "user".to_string(),
                    parts: vec![GeminiPart::text(text)],
                });
            }

            "assistant" => {
                let mut parts = Vec::new();
                if let Some(content) = &msg.content {
                    let text = content.to_text();
                    if !text.is_empty() {
                        parts.push(GeminiPart::text(text));
                    }
                }
                if let Some(tool_calls) = msg.tool_calls {
                    for (j, call) in tool_calls.into_iter().enumerate() {
                        let args: serde_json::Value =
                            serde_json::from_str(&call.function.arguments).map_err(|e| {
                                GatewayError::Validation(format!(
                                    "messages[{}].tool_calls[{}].function.arguments: invalid JSON ({})",
                                    i, j, e
                                ))
                            })?;
                        call_id_to_name.insert(call.id, call.function.name.clone());
                        parts.push(GeminiPart::FunctionCall {
                            function_call: FunctionCall {
                                name: call.function.name,
                                args,
                            },
                        });
                    }
                }
                if parts.is_empty() {
                    parts.push(GeminiPart::text(String::new()));
                }
                contents.push(Content {
                    role: "model".to_string(),
                    parts,
                });
            }

            "tool" => {
                let call_id = msg.tool_call_id.ok_or_else(|| {
                    GatewayError::Validation(format!(
                        "messages[{}].tool_call_id: required for tool messages",
                        i
                    ))
                })?;
                let name = call_id_to_name.get(&call_id).cloned().ok_or_else(|| {
                    GatewayError::Validation(format!(
                        "messages[{}].tool_call_id: no preceding tool call with id '{}'",
                        i, call_id
                    ))
                })?;
                let output = msg
                    .content
                    .as_ref()
                    .map(|c| c.to_text())
                    .unwrap_or_default();
                contents.push(Content {
                    role: "user".to_string(),
                    parts: vec![GeminiPart::FunctionResponse {
                        function_response: FunctionResponse {
                            name,
                            response: serde_json::json!({ "output": output }),
                        },
                    }],
                });
            }

            other => {
                return Err(GatewayError::Validation(format!(
                    "messages[{}].role: invalid role '{}'",
                    i, other
                )))
            }
        }
    }

    let system_instruction = if system_texts.is_empty() {
        None
    } else {
        Some(SystemInstruction::from_text(system_texts.join("\n")))
    };

    let generation_config = Some(GenerationConfig {
        max_output_tokens: req.max_tokens,
        temperature: req.temperature,
        top_p: req.top_p,
        top_k: None,
        stop_sequences: req.stop.map(|s| s.into_vec()),
        candidate_count: req.n,
        thinking_config: None,
    });

    let tools = req.tools.map(|tools| {
        vec![ToolDeclaration {
            function_declarations: tools
                .into_iter()
                .map(|tool| FunctionDeclaration {
                    name: tool.function.name,
                    description: tool.function.description.unwrap_or_default(),
                    parameters: tool.function.parameters.map(sanitize_schema),
                })
                .collect(),
        }]
    });

    let tool_config = tools.as_ref().map(|_| crate::models::gemini::ToolConfig {
        function_calling_config: crate::models::gemini::FunctionCallingConfig {
            mode: "AUTO".to_string(),
        },
    });

    Ok(GenerateContentRequest {
        contents,
        system_instruction,
        generation_config,
        tools,
        tool_config,
    })
}

/// Translate a Gemini response into an OpenAI chat-completions response.
///
/// The Nth candidate becomes the Nth choice; text parts collapse into one
/// content string per choice.
pub fn transform_response(
    resp: GenerateContentResponse,
    model: &str,
) -> Result<ChatCompletionResponse> {
    if resp.candidates.is_empty() {
        return Err(GatewayError::Validation(
            "candidates: missing or empty in upstream response".to_string(),
        ));
    }

    let mut choices = Vec::with_capacity(resp.candidates.len());

    for (n, candidate) in resp.candidates.into_iter().enumerate() {
        let mut text_segments: Vec<String> = Vec::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();

        for part in candidate.content.parts {
            match part {
                GeminiPart::Text { text, thought } => {
                    // Reasoning output has no slot in the OpenAI shape.
                    if thought != Some(true) {
                        text_segments.push(text);
                    }
                }
                GeminiPart::FunctionCall { function_call } => {
                    let arguments = serde_json::to_string(&function_call.args)
                        .unwrap_or_else(|_| "{}".to_string());
                    tool_calls.push(ToolCall {
                        id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                        kind: "function".to_string(),
                        function: FunctionCallPayload {
                            name: function_call.name,
                            arguments,
                        },
                    });
                }
                GeminiPart::FunctionResponse { .. } | GeminiPart::InlineData { .. } => {}
            }
        }

        let finish_reason = map_finish_reason(candidate.finish_reason.as_deref(), !tool_calls.is_empty());

        let content = if text_segments.is_empty() {
            None
        } else {
            Some(text_segments.concat())
        };

        choices.push(Choice {
            index: n as u32,
            message: AssistantMessage {
                role: "assistant".to_string(),
                content,
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls)
                },
            },
            finish_reason: Some(finish_reason),
        });
    }

    let usage = resp
        .usage_metadata
        .map(|u| {
            let prompt = u.prompt_token_count.unwrap_or(0);
            let completion = u.candidates_token_count.unwrap_or(0);
            UsageInfo {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: u.total_token_count.unwrap_or(prompt + completion),
            }
        })
        .unwrap_or_default();

    Ok(ChatCompletionResponse::new(model.to_string(), choices, usage))
}

/// Map Gemini finish reason to OpenAI's vocabulary.
pub fn map_finish_reason(finish_reason: Option<&str>, had_tool_calls: bool) -> String {
    if had_tool_calls {
        return "tool_calls".to_string();
    }
    match finish_reason {
        Some("MAX_TOKENS") => "length".to_string(),
        Some("SAFETY") | Some("RECITATION") => "content_filter".to_string(),
        _ => "stop".to_string(),
    }
}
