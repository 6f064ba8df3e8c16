// Claude Messages ↔ Gemini translation

use crate::error::{GatewayError, Result};
use crate::models::claude::{
    ContentBlock, Message, MessageContent, MessagesRequest, MessagesResponse, Usage,
};
use crate::models::gemini::{
    Content, FunctionCall, FunctionDeclaration, FunctionResponse, GenerateContentRequest,
    GenerateContentResponse, GenerationConfig, Part as GeminiPart, SystemInstruction,
    ThinkingConfig, ToolDeclaration,
};
use crate::translation::tools::sanitize_schema;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Translate an Anthropic Messages request into Gemini's native shape.
pub fn transform_request(req: MessagesRequest) -> Result<GenerateContentRequest> {
    debug!(model = %req.model, messages = req.messages.len(), "translating Claude request");

    let contents = translate_messages(req.messages)?;

    let system_instruction = req
        .system
        .map(|sys| SystemInstruction::from_text(sys.to_text()));

    let thinking_config = req.thinking.and_then(|t| {
        if t.type_ == "enabled" {
            Some(ThinkingConfig {
                include_thoughts: Some(true),
                thinking_budget: Some(t.budget_tokens),
            })
        } else {
            None
        }
    });

    let generation_config = Some(GenerationConfig {
        max_output_tokens: Some(req.max_tokens),
        temperature: req.temperature,
        top_p: req.top_p,
        top_k: req.top_k,
        stop_sequences: req.stop_sequences,
        candidate_count: None,
        thinking_config,
    });

    let tools = req.tools.map(|tools| {
        vec![ToolDeclaration {
            function_declarations: tools
                .into_iter()
                .map(|tool| FunctionDeclaration {
                    name: tool.name,
                    description: tool.description.unwrap_or_default(),
                    parameters: Some(sanitize_schema(tool.input_schema)),
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

/// Translate the messages array, mapping roles and content blocks.
fn translate_messages(messages: Vec<Message>) -> Result<Vec<Content>> {
    // tool_use_id → tool name, for building functionResponse parts
    let mut tool_id_to_name: HashMap<String, String> = HashMap::new();

    messages
        .into_iter()
        .enumerate()
        .map(|(i, msg)| {
            let role = match msg.role.as_str() {
                "user" => "user",
                "assistant" => "model",
                other => {
                    return Err(GatewayError::Validation(format!(
                        "messages[{}].role: invalid role '{}'",
                        i, other
                    )))
                }
            };

            let parts = match msg.content {
                MessageContent::Text(text) => vec![GeminiPart::text(text)],
                MessageContent::Blocks(blocks) => blocks
                    .into_iter()
                    .enumerate()
                    .map(|(j, block)| translate_content_block(i, j, block, &mut tool_id_to_name))
                    .collect::<Result<Vec<_>>>()?,
            };

            Ok(Content {
                role: role.to_string(),
                parts,
            })
        })
        .collect()
}

fn translate_content_block(
    msg_index: usize,
    block_index: usize,
    block: ContentBlock,
    tool_id_to_name: &mut HashMap<String, String>,
) -> Result<GeminiPart> {
    match block {
        ContentBlock::Text { text } => Ok(GeminiPart::text(text)),

        ContentBlock::Thinking { thinking } => Ok(GeminiPart::Text {
            text: thinking,
            thought: Some(true),
        }),

        ContentBlock::ToolUse { id, name, input } => {
            tool_id_to_name.insert(id, name.clone());
            Ok(GeminiPart::FunctionCall {
                function_call: FunctionCall { name, args: input },
            })
        }

        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => {
            let tool_name = tool_id_to_name.get(&tool_use_id).cloned().ok_or_else(|| {
                GatewayError::Validation(format!(
                    "messages[{}].content[{}].tool_use_id: no preceding tool_use with id '{}'",
                    msg_index, block_index, tool_use_id
                ))
            })?;

            let response = if is_error.unwrap_or(false) {
                serde_json::json!({ "error": content.to_string() })
            } else {
                serde_json::json!({ "output": content.to_string() })
            };

            Ok(GeminiPart::FunctionResponse {
                function_response: FunctionResponse {
                    name: tool_name,
                    response,
                },
            })
        }
    }
}

/// Translate a Gemini response into an Anthropic Messages response.
pub fn transform_response(
    resp: GenerateContentResponse,
    model: &str,
) -> Result<MessagesResponse> {
    let candidate = resp.candidates.into_iter().next().ok_or_else(|| {
        GatewayError::Validation("candidates: missing or empty in upstream response".to_string())
    })?;

    let mut had_tool_use = false;
    let mut content = Vec::new();

    for part in candidate.content.parts {
        match part {
            GeminiPart::Text { text, thought } => {
                if thought == Some(true) {
                    content.push(ContentBlock::Thinking { thinking: text });
                } else {
                    content.push(ContentBlock::Text { text });
                }
            }

            GeminiPart::FunctionCall { function_call } => {
                had_tool_use = true;
                content.push(ContentBlock::ToolUse {
                    id: format!("toolu_{}", uuid::Uuid::new_v4().simple()),
                    name: function_call.name,
                    input: function_call.args,
                });
            }

            GeminiPart::FunctionResponse { function_response } => {
                warn!(
                    name = %function_response.name,
                    "unexpected function response in model output"
                );
                return Err(GatewayError::Validation(
                    "candidates[0].content.parts: functionResponse must not appear in model output"
                        .to_string(),
                ));
            }

            GeminiPart::InlineData { .. } => {
                // Generated media has no Claude text equivalent; skip.
            }
        }
    }

    let stop_reason = map_stop_reason(candidate.finish_reason.as_deref(), had_tool_use);

    let usage = resp
        .usage_metadata
        .map(|u| Usage {
            input_tokens: u.prompt_token_count.unwrap_or(0),
            output_tokens: u.candidates_token_count.unwrap_or(0),
        })
        .unwrap_or_default();

    let mut response = MessagesResponse::new(model.to_string(), content, usage);
    response.stop_reason = stop_reason;
    Ok(response)
}

/// Map Gemini finish reason to Anthropic stop reason.
pub fn map_stop_reason(finish_reason: Option<&str>, had_tool_use: bool) -> Option<String> {
    match finish_reason {
        Some("STOP") if had_tool_use => Some("tool_use".to_string()),
        Some("STOP") => Some("end_turn".to_string()),
        Some("MAX_TOKENS") => Some("max_tokens".to_string()),
        Some("SAFETY") | Some("RECITATION") => Some("stop_sequence".to_string()),
        Some("OTHER") | None => None,
        Some(other) => {
            warn!(reason = other, "unknown finish reason");
            None
        }
    }
}
