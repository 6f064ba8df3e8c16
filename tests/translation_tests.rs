// Cross-protocol translation tests

use gemgate::models::claude::{
    Message, MessageContent, MessagesRequest, SystemPrompt,
};
use gemgate::models::gemini::{
    Candidate, Content, GenerateContentResponse, Part, UsageMetadata,
};
use gemgate::models::openai::{ChatCompletionRequest, ChatMessage, ChatMessageContent};
use gemgate::translation;
use gemgate::validation;

fn claude_request(messages: Vec<Message>, max_tokens: u32) -> MessagesRequest {
    MessagesRequest {
        model: "claude-sonnet-4-5".to_string(),
        messages,
        system: None,
        max_tokens,
        temperature: None,
        top_p: None,
        top_k: None,
        stop_sequences: None,
        tools: None,
        thinking: None,
        stream: None,
    }
}

fn user(text: &str) -> Message {
    Message {
        role: "user".to_string(),
        content: MessageContent::Text(text.to_string()),
    }
}

fn assistant(text: &str) -> Message {
    Message {
        role: "assistant".to_string(),
        content: MessageContent::Text(text.to_string()),
    }
}

fn openai_request(messages: Vec<ChatMessage>) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: "gpt-4o".to_string(),
        messages,
        temperature: None,
        top_p: None,
        n: None,
        stream: None,
        stop: None,
        max_tokens: None,
        tools: None,
        tool_choice: None,
        user: None,
    }
}

fn openai_message(role: &str, text: &str) -> ChatMessage {
    ChatMessage {
        role: role.to_string(),
        content: Some(ChatMessageContent::Text(text.to_string())),
        name: None,
        tool_calls: None,
        tool_call_id: None,
    }
}

/// Build a synthetic Gemini response echoing one text candidate.
fn synthetic_response(text: &str) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Content {
                role: "model".to_string(),
                parts: vec![Part::text(text)],
            },
            finish_reason: Some("STOP".to_string()),
            index: Some(0),
            safety_ratings: None,
        }],
        usage_metadata: Some(UsageMetadata {
            prompt_token_count: Some(8),
            candidates_token_count: Some(4),
            total_token_count: Some(12),
            thoughts_token_count: None,
        }),
        prompt_feedback: None,
        model_version: None,
    }
}

#[test]
fn test_claude_scenario_max_tokens_and_contents() {
    // {max_tokens: 100, messages: [{role: user, content: "Hi"}]}
    let req = claude_request(vec![user("Hi")], 100);
    validation::validate_claude(&req).unwrap();

    let gemini = translation::claude::transform_request(req).unwrap();
    assert_eq!(
        gemini.generation_config.as_ref().unwrap().max_output_tokens,
        Some(100)
    );
    assert_eq!(gemini.contents.len(), 1);
}

#[test]
fn test_claude_round_trip_preserves_content() {
    let req = claude_request(vec![user("What is Rust?")], 512);
    let gemini_req = translation::claude::transform_request(req).unwrap();
    assert_eq!(gemini_req.contents.len(), 1);

    let response = translation::claude::transform_response(
        synthetic_response("A systems programming language."),
        "claude-sonnet-4-5",
    )
    .unwrap();

    assert_eq!(response.content.len(), 1);
    match &response.content[0] {
        gemgate::models::claude::ContentBlock::Text { text } => {
            assert!(!text.is_empty());
        }
        other => panic!("expected text block, got {:?}", other),
    }
    assert_eq!(response.usage.input_tokens, 8);
    assert_eq!(response.usage.output_tokens, 4);
}

#[test]
fn test_claude_multi_turn_round_trip() {
    let req = claude_request(
        vec![user("hi"), assistant("hello"), user("bye")],
        256,
    );
    validation::validate_claude(&req).unwrap();

    let gemini_req = translation::claude::transform_request(req).unwrap();
    // Message count preserved through normalization.
    assert_eq!(gemini_req.contents.len(), 3);
    assert_eq!(gemini_req.contents[1].role, "model");
    assert!(gemini_req.contents.iter().all(|c| !c.parts.is_empty()));
}

#[test]
fn test_openai_round_trip_preserves_content() {
    let req = openai_request(vec![
        openai_message("system", "answer briefly"),
        openai_message("user", "What is Rust?"),
    ]);
    validation::validate_openai(&req).unwrap();

    let gemini_req = translation::openai::transform_request(req).unwrap();
    // System extracted, one content remains.
    assert_eq!(gemini_req.contents.len(), 1);
    assert!(gemini_req.system_instruction.is_some());

    let response = translation::openai::transform_response(
        synthetic_response("A language."),
        "gpt-4o",
    )
    .unwrap();

    assert_eq!(response.choices.len(), 1);
    let content = response.choices[0].message.content.as_deref().unwrap();
    assert!(!content.is_empty());
    assert_eq!(response.usage.total_tokens, 12);
    assert!(response.id.starts_with("chatcmpl-"));
}

#[test]
fn test_claude_alternation_enforced_before_transform() {
    let req = claude_request(vec![user("a"), user("b")], 64);
    let err = validation::validate_claude(&req).unwrap_err();
    assert!(err.to_string().contains("messages[1].role"));
}

#[test]
fn test_claude_system_flattening() {
    let mut req = claude_request(vec![user("hi")], 64);
    req.system = Some(SystemPrompt::Blocks(vec![
        gemgate::models::claude::ContentBlock::Text {
            text: "first".to_string(),
        },
        gemgate::models::claude::ContentBlock::Text {
            text: "second".to_string(),
        },
    ]));

    let gemini_req = translation::claude::transform_request(req).unwrap();
    let instruction = gemini_req.system_instruction.unwrap();
    assert_eq!(instruction.parts[0].as_text(), Some("first\nsecond"));
}

#[test]
fn test_gemini_native_identity_and_candidates_check() {
    let body = serde_json::json!({
        "contents": [{"role": "user", "parts": [{"text": "Hi"}]}]
    });
    let req = translation::gemini::transform_request(body).unwrap();
    validation::validate_gemini(&req).unwrap();

    let ok = translation::gemini::passthrough_response(serde_json::json!({
        "candidates": [{"content": {"parts": [{"text": "Hey"}]}}]
    }));
    assert!(ok.is_ok());

    let missing = translation::gemini::passthrough_response(serde_json::json!({
        "promptFeedback": {}
    }));
    let err = missing.unwrap_err();
    assert!(err.to_string().contains("candidates"));
}

#[test]
fn test_validation_happens_before_any_transform() {
    // An out-of-range max_tokens fails validation even though the
    // transform itself would accept it.
    let req = claude_request(vec![user("hi")], 100_000);
    assert!(validation::validate_claude(&req).is_err());
}
