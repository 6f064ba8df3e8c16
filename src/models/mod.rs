//! Data models for the three inbound wire protocols and the upstream Gemini API.
//!
//! - `openai`: OpenAI chat-completions request/response/chunk shapes
//! - `claude`: Anthropic Messages API shapes
//! - `gemini`: Google Gemini public `v1beta` shapes (the normalized form)
//! - `streaming`: Anthropic SSE event vocabulary
//! - `mapping`: inbound model-name aliases → Gemini model names

pub mod claude;
pub mod gemini;
pub mod mapping;
pub mod openai;
pub mod streaming;

pub use claude::{MessagesRequest, MessagesResponse};
pub use gemini::{GenerateContentRequest, GenerateContentResponse};
pub use mapping::resolve_model;
pub use openai::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse};

/// The wire protocol a caller speaks.
///
/// Tagged explicitly on every request so that transforms, stream translation
/// and error rendering can match exhaustively instead of sniffing shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    OpenAi,
    Claude,
    Gemini,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::OpenAi => "openai",
            Protocol::Claude => "claude",
            Protocol::Gemini => "gemini",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
