// Stream event translation: Gemini chunks → outbound protocol events

use crate::error::ErrorEnvelope;
use crate::models::claude::Usage;
use crate::models::gemini::{GenerateContentResponse, Part as GeminiPart};
use crate::models::openai::{
    ChatCompletionChunk, ChunkChoice, ChunkDelta, ChunkToolCall, FunctionCallPayload,
};
use crate::models::streaming::*;
use crate::models::Protocol;
use crate::relay::EventTranslator;
use bytes::Bytes;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, PartialEq, Clone, Copy)]
enum BlockType {
    Text,
    Thinking,
}

/// Translates Gemini streaming chunks into Anthropic SSE events.
///
/// Tracks open content blocks so that text, thinking and tool-use segments
/// are framed with correct start/stop transitions and indices.
pub struct ClaudeStreamTranslator {
    message_id: String,
    model: String,
    input_tokens: u32,
    output_tokens: u32,
    first_chunk: bool,
    current_block_index: i32,
    current_block_type: Option<BlockType>,
    had_tool_use: bool,
    finished: bool,
}

impl ClaudeStreamTranslator {
    pub fn new(model: String) -> Self {
        Self {
            message_id: format!("msg_{}", uuid::Uuid::new_v4().simple()),
            model,
            input_tokens: 0,
            output_tokens: 0,
            first_chunk: true,
            current_block_index: 0,
            current_block_type: None,
            had_tool_use: false,
            finished: false,
        }
    }

    /// Translate one Gemini chunk into Anthropic SSE events.
    pub fn translate_chunk(&mut self, chunk: GenerateContentResponse) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }

        let mut events = Vec::new();

        if self.first_chunk {
            if let Some(usage) = &chunk.usage_metadata {
                self.input_tokens = usage.prompt_token_count.unwrap_or(0);
            }

            events.push(StreamEvent::MessageStart {
                message: MessageStart {
                    id: self.message_id.clone(),
                    message_type: "message".to_string(),
                    role: "assistant".to_string(),
                    content: vec![],
                    model: self.model.clone(),
                    stop_reason: None,
                    stop_sequence: None,
                    usage: Usage {
                        input_tokens: self.input_tokens,
                        output_tokens: 0,
                    },
                },
            });

            self.first_chunk = false;
        }

        if let Some(usage) = &chunk.usage_metadata {
            if let Some(output) = usage.candidates_token_count {
                self.output_tokens = output;
            }
        }

        let Some(candidate) = chunk.candidates.into_iter().next() else {
            return events;
        };

        for part in candidate.content.parts {
            match part {
                GeminiPart::Text { text, thought } => {
                    if text.is_empty() {
                        continue;
                    }
                    if thought == Some(true) {
                        self.ensure_block(&mut events, BlockType::Thinking);
                        events.push(StreamEvent::ContentBlockDelta {
                            index: self.current_block_index,
                            delta: Delta::ThinkingDelta { thinking: text },
                        });
                    } else {
                        self.ensure_block(&mut events, BlockType::Text);
                        events.push(StreamEvent::ContentBlockDelta {
                            index: self.current_block_index,
                            delta: Delta::TextDelta { text },
                        });
                    }
                }

                GeminiPart::FunctionCall { function_call } => {
                    self.close_block(&mut events);

                    // Tool use arrives as one whole object; frame it as an
                    // atomic start/delta/stop triple.
                    let tool_id = format!("toolu_{}", uuid::Uuid::new_v4().simple());
                    let args_json = serde_json::to_string(&function_call.args)
                        .unwrap_or_else(|_| "{}".to_string());

                    events.push(StreamEvent::ContentBlockStart {
                        index: self.current_block_index,
                        content_block: ContentBlockStart::ToolUse {
                            id: tool_id,
                            name: function_call.name,
                        },
                    });
                    events.push(StreamEvent::ContentBlockDelta {
                        index: self.current_block_index,
                        delta: Delta::InputJsonDelta {
                            partial_json: args_json,
                        },
                    });
                    events.push(StreamEvent::ContentBlockStop {
                        index: self.current_block_index,
                    });

                    self.current_block_index += 1;
                    self.had_tool_use = true;
                }

                GeminiPart::InlineData { .. } | GeminiPart::FunctionResponse { .. } => {}
            }
        }

        if let Some(finish_reason) = candidate.finish_reason {
            events.extend(self.terminate(Some(&finish_reason)));
        }

        events
    }

    /// Terminal framing if the upstream ended without a finish reason.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        self.terminate(None)
    }

    fn terminate(&mut self, finish_reason: Option<&str>) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;

        let mut events = Vec::new();

        // An upstream that produced no chunks still gets a framed message.
        if self.first_chunk {
            self.first_chunk = false;
            events.push(StreamEvent::MessageStart {
                message: MessageStart {
                    id: self.message_id.clone(),
                    message_type: "message".to_string(),
                    role: "assistant".to_string(),
                    content: vec![],
                    model: self.model.clone(),
                    stop_reason: None,
                    stop_sequence: None,
                    usage: Usage {
                        input_tokens: self.input_tokens,
                        output_tokens: 0,
                    },
                },
            });
        }

        self.close_block(&mut events);

        let stop_reason = match finish_reason {
            Some(reason) => {
                crate::translation::claude::map_stop_reason(Some(reason), self.had_tool_use)
            }
            None => Some(if self.had_tool_use { "tool_use" } else { "end_turn" }.to_string()),
        };

        events.push(StreamEvent::MessageDelta {
            delta: MessageDeltaData {
                stop_reason,
                stop_sequence: None,
            },
            usage: DeltaUsage {
                output_tokens: self.output_tokens,
            },
        });
        events.push(StreamEvent::MessageStop);
        events
    }

    fn ensure_block(&mut self, events: &mut Vec<StreamEvent>, target: BlockType) {
        if let Some(current) = self.current_block_type {
            if current != target {
                self.close_block(events);
            }
        }

        if self.current_block_type.is_none() {
            let content_block = match target {
                BlockType::Text => ContentBlockStart::Text {
                    text: String::new(),
                },
                BlockType::Thinking => ContentBlockStart::Thinking,
            };
            events.push(StreamEvent::ContentBlockStart {
                index: self.current_block_index,
                content_block,
            });
            self.current_block_type = Some(target);
        }
    }

    fn close_block(&mut self, events: &mut Vec<StreamEvent>) {
        if self.current_block_type.is_some() {
            events.push(StreamEvent::ContentBlockStop {
                index: self.current_block_index,
            });
            self.current_block_index += 1;
            self.current_block_type = None;
        }
    }
}

impl EventTranslator for ClaudeStreamTranslator {
    fn on_event(&mut self, event: &Value) -> Vec<Bytes> {
        match serde_json::from_value::<GenerateContentResponse>(event.clone()) {
            Ok(chunk) => self
                .translate_chunk(chunk)
                .iter()
                .map(|e| Bytes::from(e.to_sse()))
                .collect(),
            Err(e) => {
                warn!(error = %e, "dropping unrecognized upstream event");
                crate::metrics::record_translation_error(Protocol::Claude, "stream");
                Vec::new()
            }
        }
    }

    fn on_done(&mut self) -> Vec<Bytes> {
        self.finish()
            .iter()
            .map(|e| Bytes::from(e.to_sse()))
            .collect()
    }

    fn on_error(&mut self, envelope: &ErrorEnvelope) -> Vec<Bytes> {
        self.finished = true;
        let event = StreamEvent::Error {
            error: ErrorData {
                error_type: "api_error".to_string(),
                message: envelope.message.clone(),
            },
        };
        vec![Bytes::from(event.to_sse())]
    }

    fn keepalive(&mut self) -> Option<Bytes> {
        Some(Bytes::from(StreamEvent::Ping.to_sse()))
    }
}

/// Translates Gemini streaming chunks into OpenAI chat.completion.chunk
/// events, terminated by the `[DONE]` sentinel.
pub struct OpenAiStreamTranslator {
    id: String,
    created: i64,
    model: String,
    first_chunk: bool,
    finished: bool,
}

impl OpenAiStreamTranslator {
    pub fn new(model: String) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            created: chrono::Utc::now().timestamp(),
            model,
            first_chunk: true,
            finished: false,
        }
    }

    fn chunk(&self, delta: ChunkDelta, finish_reason: Option<String>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
            usage: None,
        }
    }

    /// Translate one Gemini chunk into OpenAI chunks.
    pub fn translate_chunk(&mut self, chunk: GenerateContentResponse) -> Vec<ChatCompletionChunk> {
        if self.finished {
            return Vec::new();
        }

        let mut out = Vec::new();

        if self.first_chunk {
            out.push(self.chunk(
                ChunkDelta {
                    role: Some("assistant".to_string()),
                    ..Default::default()
                },
                None,
            ));
            self.first_chunk = false;
        }

        let Some(candidate) = chunk.candidates.into_iter().next() else {
            return out;
        };

        let mut text_segments: Vec<String> = Vec::new();
        let mut tool_calls: Vec<ChunkToolCall> = Vec::new();

        for part in candidate.content.parts {
            match part {
                GeminiPart::Text { text, thought } => {
                    if thought != Some(true) && !text.is_empty() {
                        text_segments.push(text);
                    }
                }
                GeminiPart::FunctionCall { function_call } => {
                    let arguments = serde_json::to_string(&function_call.args)
                        .unwrap_or_else(|_| "{}".to_string());
                    tool_calls.push(ChunkToolCall {
                        index: tool_calls.len() as u32,
                        id: Some(format!("call_{}", uuid::Uuid::new_v4().simple())),
                        kind: Some("function".to_string()),
                        function: FunctionCallPayload {
                            name: function_call.name,
                            arguments,
                        },
                    });
                }
                GeminiPart::InlineData { .. } | GeminiPart::FunctionResponse { .. } => {}
            }
        }

        let had_tool_calls = !tool_calls.is_empty();

        if !text_segments.is_empty() {
            out.push(self.chunk(
                ChunkDelta {
                    content: Some(text_segments.concat()),
                    ..Default::default()
                },
                None,
            ));
        }

        if had_tool_calls {
            out.push(self.chunk(
                ChunkDelta {
                    tool_calls: Some(tool_calls),
                    ..Default::default()
                },
                None,
            ));
        }

        if let Some(finish_reason) = candidate.finish_reason {
            let mapped = crate::translation::openai::map_finish_reason(
                Some(&finish_reason),
                had_tool_calls,
            );
            out.push(self.chunk(ChunkDelta::default(), Some(mapped)));
            self.finished = true;
        }

        out
    }

    /// Final chunk if the upstream ended without a finish reason.
    pub fn finish(&mut self) -> Vec<ChatCompletionChunk> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        vec![self.chunk(ChunkDelta::default(), Some("stop".to_string()))]
    }
}

impl EventTranslator for OpenAiStreamTranslator {
    fn on_event(&mut self, event: &Value) -> Vec<Bytes> {
        match serde_json::from_value::<GenerateContentResponse>(event.clone()) {
            Ok(chunk) => self
                .translate_chunk(chunk)
                .iter()
                .map(|c| Bytes::from(c.to_sse()))
                .collect(),
            Err(e) => {
                warn!(error = %e, "dropping unrecognized upstream event");
                crate::metrics::record_translation_error(Protocol::OpenAi, "stream");
                Vec::new()
            }
        }
    }

    fn on_done(&mut self) -> Vec<Bytes> {
        let mut out: Vec<Bytes> = self
            .finish()
            .iter()
            .map(|c| Bytes::from(c.to_sse()))
            .collect();
        out.push(Bytes::from_static(b"data: [DONE]\n\n"));
        out
    }

    fn on_error(&mut self, envelope: &ErrorEnvelope) -> Vec<Bytes> {
        self.finished = true;
        let body = envelope.to_protocol_json(Protocol::OpenAi);
        vec![
            Bytes::from(format!("data: {}\n\n", body)),
            Bytes::from_static(b"data: [DONE]\n\n"),
        ]
    }
}

/// Re-frames upstream Gemini chunks for native-protocol callers without
/// reshaping the event objects.
pub struct GeminiStreamTranslator {
    finished: bool,
}

impl GeminiStreamTranslator {
    pub fn new() -> Self {
        Self { finished: false }
    }
}

impl Default for GeminiStreamTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTranslator for GeminiStreamTranslator {
    fn on_event(&mut self, event: &Value) -> Vec<Bytes> {
        if self.finished {
            return Vec::new();
        }
        vec![Bytes::from(format!("data: {}\n\n", event))]
    }

    fn on_done(&mut self) -> Vec<Bytes> {
        // The native vocabulary has no terminal sentinel; closing the
        // stream is the terminal signal.
        self.finished = true;
        Vec::new()
    }

    fn on_error(&mut self, envelope: &ErrorEnvelope) -> Vec<Bytes> {
        self.finished = true;
        let body = envelope.to_protocol_json(Protocol::Gemini);
        vec![Bytes::from(format!("data: {}\n\n", body))]
    }
}
