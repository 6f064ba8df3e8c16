// HTTP request handlers

use super::routes::AppState;
use crate::balancer::{ApiKey, Selection};
use crate::error::{ErrorEnvelope, GatewayError, ProtocolError, Result};
use crate::models::claude::MessagesRequest;
use crate::models::gemini::{GenerateContentRequest, GenerateContentResponse};
use crate::models::openai::ChatCompletionRequest;
use crate::models::{resolve_model, Protocol};
use crate::relay::{relay_sse, EventTranslator};
use crate::storage::{MetricsDelta, RequestLogEntry};
use crate::translation;
use crate::translation::streaming::{
    ClaudeStreamTranslator, GeminiStreamTranslator, OpenAiStreamTranslator,
};
use crate::validation;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

// ============================================================================
// Health and metrics
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HashMap<String, HealthCheck>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let mut overall_status = HealthStatus::Healthy;

    let upstream_check = HealthCheck {
        status: "ok".to_string(),
        message: format!("upstream base: {}", state.upstream.base_url()),
    };
    checks.insert("upstream".to_string(), upstream_check);

    let summaries = state.selector.snapshot();
    let healthy = summaries.iter().filter(|s| s.is_healthy).count();
    let key_check = if !summaries.is_empty() && healthy == 0 {
        overall_status = HealthStatus::Degraded;
        HealthCheck {
            status: "warning".to_string(),
            message: format!("0 of {} tracked keys healthy", summaries.len()),
        }
    } else {
        HealthCheck {
            status: "ok".to_string(),
            message: format!("{} of {} tracked keys healthy", healthy, summaries.len()),
        }
    };
    checks.insert("key_pool".to_string(), key_check);

    let config_check = HealthCheck {
        status: "ok".to_string(),
        message: format!(
            "listening on {}:{}",
            state.config.server.host, state.config.server.port
        ),
    };
    checks.insert("configuration".to_string(), config_check);

    Json(HealthResponse {
        status: overall_status,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn metrics_handler() -> Response {
    (
        [("Content-Type", "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
        .into_response()
}

// ============================================================================
// Credential extraction
// ============================================================================

/// Pull the caller's candidate keys out of the protocol's auth header.
/// Several keys may be submitted comma-separated; the selector picks one.
fn extract_keys(headers: &HeaderMap, protocol: Protocol) -> Result<Vec<ApiKey>> {
    let raw = match protocol {
        Protocol::OpenAi => headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string),
        Protocol::Claude => headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        Protocol::Gemini => headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    let header_name = match protocol {
        Protocol::OpenAi => "Authorization",
        Protocol::Claude => "x-api-key",
        Protocol::Gemini => "x-goog-api-key",
    };

    let raw = raw.ok_or_else(|| {
        GatewayError::Authentication(format!("missing API key in {} header", header_name))
    })?;

    let keys: Vec<ApiKey> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ApiKey::new)
        .collect();

    if keys.is_empty() {
        return Err(GatewayError::Authentication(format!(
            "empty API key in {} header",
            header_name
        )));
    }

    Ok(keys)
}

// ============================================================================
// Upstream dispatch
// ============================================================================

/// Select a key, call the upstream, and account for the outcome.
///
/// Upstream and network failures are charged against the selected
/// credential before the error is surfaced; validation failures never get
/// this far. Persistence and metrics are fire-and-forget.
async fn dispatch_blocking(
    state: &AppState,
    protocol: Protocol,
    endpoint: &str,
    upstream_model: &str,
    keys: &[ApiKey],
    gemini_req: &GenerateContentRequest,
) -> std::result::Result<Value, GatewayError> {
    let selection = state.selector.select(keys)?;
    crate::metrics::record_selection(selection.reason);
    crate::metrics::update_key_pool(state.selector.tracked_count(), selection.healthy_count);

    let start = Instant::now();
    let result = state
        .upstream
        .generate_content(upstream_model, &selection.key, gemini_req)
        .await;
    let latency = start.elapsed();

    match result {
        Ok(value) => {
            state.selector.record_outcome(&selection.key, latency, true);
            crate::metrics::record_upstream_call(upstream_model, 200, false, latency.as_secs_f64());

            let (input_tokens, output_tokens) = usage_from_value(&value);
            persist_outcome(
                state,
                &selection,
                protocol,
                endpoint,
                upstream_model,
                200,
                latency,
                input_tokens,
                output_tokens,
                false,
                None,
            );

            Ok(value)
        }
        Err(err) => {
            let envelope = ErrorEnvelope::from_error(&err);
            if envelope.counts_against_key() {
                state.selector.record_outcome(&selection.key, latency, false);
            }
            crate::metrics::record_upstream_call(
                upstream_model,
                envelope.http_status,
                false,
                latency.as_secs_f64(),
            );
            persist_outcome(
                state,
                &selection,
                protocol,
                endpoint,
                upstream_model,
                envelope.http_status,
                latency,
                None,
                None,
                false,
                Some(envelope.message.clone()),
            );

            error!(
                protocol = %protocol,
                key = %selection.key.masked(),
                status = envelope.http_status,
                "upstream call failed: {}",
                envelope.message
            );
            Err(err)
        }
    }
}

/// Select a key, open the upstream stream, and hand it to a translator.
///
/// The connect latency is the credential's recorded outcome: once the
/// upstream has accepted the stream, mid-flight errors are relayed to the
/// caller as in-band error events instead.
async fn dispatch_streaming<T>(
    state: &AppState,
    protocol: Protocol,
    endpoint: &str,
    upstream_model: &str,
    keys: &[ApiKey],
    gemini_req: &GenerateContentRequest,
    translator: T,
) -> std::result::Result<Response, GatewayError>
where
    T: EventTranslator + 'static,
{
    let selection = state.selector.select(keys)?;
    crate::metrics::record_selection(selection.reason);
    crate::metrics::update_key_pool(state.selector.tracked_count(), selection.healthy_count);

    let start = Instant::now();
    let byte_stream = match state
        .upstream
        .stream_generate_content(upstream_model, &selection.key, gemini_req)
        .await
    {
        Ok(stream) => stream,
        Err(err) => {
            let latency = start.elapsed();
            let envelope = ErrorEnvelope::from_error(&err);
            if envelope.counts_against_key() {
                state.selector.record_outcome(&selection.key, latency, false);
            }
            crate::metrics::record_upstream_call(
                upstream_model,
                envelope.http_status,
                true,
                latency.as_secs_f64(),
            );
            persist_outcome(
                state,
                &selection,
                protocol,
                endpoint,
                upstream_model,
                envelope.http_status,
                latency,
                None,
                None,
                true,
                Some(envelope.message.clone()),
            );
            return Err(err);
        }
    };

    let connect_latency = start.elapsed();
    state
        .selector
        .record_outcome(&selection.key, connect_latency, true);
    crate::metrics::record_upstream_call(upstream_model, 200, true, connect_latency.as_secs_f64());
    crate::metrics::record_sse_event(protocol);
    persist_outcome(
        state,
        &selection,
        protocol,
        endpoint,
        upstream_model,
        200,
        connect_latency,
        None,
        None,
        true,
        None,
    );

    debug!(protocol = %protocol, model = upstream_model, "relaying upstream stream");

    let body = Body::from_stream(relay_sse(byte_stream, translator));

    let mut builder = Response::builder()
        .status(200)
        .header("Content-Type", "text/event-stream; charset=utf-8")
        .header("Cache-Control", "no-cache")
        .header("Connection", "keep-alive")
        .header("X-Accel-Buffering", "no");

    if protocol == Protocol::Claude {
        builder = builder.header("anthropic-version", "2023-06-01");
    }

    builder
        .body(body)
        .map_err(|e| GatewayError::Internal(format!("failed to build response: {}", e)))
}

/// Fire-and-forget request logging and key-metrics history.
#[allow(clippy::too_many_arguments)]
fn persist_outcome(
    state: &AppState,
    selection: &Selection,
    protocol: Protocol,
    endpoint: &str,
    model: &str,
    status_code: u16,
    latency: Duration,
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
    is_stream: bool,
    error_message: Option<String>,
) {
    let latency_ms = latency.as_millis() as u64;
    let hashed_key = selection.key.hashed();
    let success = error_message.is_none();

    state.store.log_request(RequestLogEntry {
        hashed_key: hashed_key.clone(),
        model: model.to_string(),
        endpoint: endpoint.to_string(),
        status_code,
        latency_ms,
        input_tokens,
        output_tokens,
        is_stream,
        error_message,
        timestamp: chrono::Utc::now(),
    });

    state.store.update_key_metrics(
        &hashed_key,
        MetricsDelta {
            success: success as u64,
            failure: (!success) as u64,
            latency_ms,
        },
    );

    crate::metrics::record_request(
        protocol,
        endpoint,
        status_code,
        model,
        latency.as_secs_f64(),
    );
}

fn usage_from_value(value: &Value) -> (Option<u32>, Option<u32>) {
    let usage = value.get("usageMetadata");
    (
        usage
            .and_then(|u| u.get("promptTokenCount"))
            .and_then(|v| v.as_u64())
            .map(|v| v as u32),
        usage
            .and_then(|u| u.get("candidatesTokenCount"))
            .and_then(|v| v.as_u64())
            .map(|v| v as u32),
    )
}

// ============================================================================
// OpenAI surface
// ============================================================================

/// Handler for /v1/chat/completions (OpenAI chat-completions compatible).
pub async fn chat_completions_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> std::result::Result<Response, ProtocolError> {
    let wrap = |e: GatewayError| ProtocolError::new(Protocol::OpenAi, e);

    let keys = extract_keys(&headers, Protocol::OpenAi).map_err(wrap)?;

    let req: ChatCompletionRequest = serde_json::from_str(&body)
        .map_err(|e| wrap(GatewayError::Validation(format!("request body: {}", e))))?;

    info!(
        model = %req.model,
        messages = req.messages.len(),
        stream = req.stream.unwrap_or(false),
        keys = keys.len(),
        "chat completions request"
    );

    validation::validate_openai(&req).map_err(wrap)?;
    let upstream_model = resolve_model(&req.model).map_err(wrap)?;

    let inbound_model = req.model.clone();
    let stream = req.stream.unwrap_or(false);
    let gemini_req = translation::openai::transform_request(req).map_err(wrap)?;

    if stream {
        let translator = OpenAiStreamTranslator::new(inbound_model);
        dispatch_streaming(
            &state,
            Protocol::OpenAi,
            "/v1/chat/completions",
            &upstream_model,
            &keys,
            &gemini_req,
            translator,
        )
        .await
        .map_err(wrap)
    } else {
        let value = dispatch_blocking(
            &state,
            Protocol::OpenAi,
            "/v1/chat/completions",
            &upstream_model,
            &keys,
            &gemini_req,
        )
        .await
        .map_err(wrap)?;

        let typed: GenerateContentResponse =
            serde_json::from_value(value).map_err(|e| {
                wrap(GatewayError::UpstreamApi {
                    status: 502,
                    message: format!("response parsing error: {}", e),
                })
            })?;

        let response =
            translation::openai::transform_response(typed, &inbound_model).map_err(wrap)?;
        crate::metrics::record_tokens(
            &upstream_model,
            response.usage.prompt_tokens,
            response.usage.completion_tokens,
        );

        Ok(Json(response).into_response())
    }
}

// ============================================================================
// Claude surface
// ============================================================================

/// Handler for /v1/messages (Anthropic Messages API compatible).
pub async fn messages_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> std::result::Result<Response, ProtocolError> {
    let wrap = |e: GatewayError| ProtocolError::new(Protocol::Claude, e);

    let keys = extract_keys(&headers, Protocol::Claude).map_err(wrap)?;

    let req: MessagesRequest = serde_json::from_str(&body)
        .map_err(|e| wrap(GatewayError::Validation(format!("request body: {}", e))))?;

    info!(
        model = %req.model,
        messages = req.messages.len(),
        stream = req.stream.unwrap_or(false),
        keys = keys.len(),
        "messages request"
    );

    validation::validate_claude(&req).map_err(wrap)?;
    let upstream_model = resolve_model(&req.model).map_err(wrap)?;

    let inbound_model = req.model.clone();
    let stream = req.stream.unwrap_or(false);
    let gemini_req = translation::claude::transform_request(req).map_err(wrap)?;

    if stream {
        let translator = ClaudeStreamTranslator::new(inbound_model);
        dispatch_streaming(
            &state,
            Protocol::Claude,
            "/v1/messages",
            &upstream_model,
            &keys,
            &gemini_req,
            translator,
        )
        .await
        .map_err(wrap)
    } else {
        let value = dispatch_blocking(
            &state,
            Protocol::Claude,
            "/v1/messages",
            &upstream_model,
            &keys,
            &gemini_req,
        )
        .await
        .map_err(wrap)?;

        let typed: GenerateContentResponse =
            serde_json::from_value(value).map_err(|e| {
                wrap(GatewayError::UpstreamApi {
                    status: 502,
                    message: format!("response parsing error: {}", e),
                })
            })?;

        let response =
            translation::claude::transform_response(typed, &inbound_model).map_err(wrap)?;
        crate::metrics::record_tokens(
            &upstream_model,
            response.usage.input_tokens,
            response.usage.output_tokens,
        );

        Ok(Json(response).into_response())
    }
}

// ============================================================================
// Gemini-native surface
// ============================================================================

/// Handler for /v1beta/models/{model}:generateContent and
/// {model}:streamGenerateContent (Gemini native).
pub async fn gemini_handler(
    State(state): State<AppState>,
    Path(model_action): Path<String>,
    headers: HeaderMap,
    body: String,
) -> std::result::Result<Response, ProtocolError> {
    let wrap = |e: GatewayError| ProtocolError::new(Protocol::Gemini, e);

    let keys = extract_keys(&headers, Protocol::Gemini).map_err(wrap)?;

    let (model_raw, action) = model_action.split_once(':').ok_or_else(|| {
        wrap(GatewayError::Validation(
            "path: expected models/{model}:generateContent or :streamGenerateContent".to_string(),
        ))
    })?;

    let stream = match action {
        "generateContent" => false,
        "streamGenerateContent" => true,
        other => {
            return Err(wrap(GatewayError::Validation(format!(
                "path: unknown action '{}'",
                other
            ))))
        }
    };

    let upstream_model = resolve_model(model_raw).map_err(wrap)?;

    let raw_body: Value = serde_json::from_str(&body)
        .map_err(|e| wrap(GatewayError::Validation(format!("request body: {}", e))))?;

    // Identity transform: deserializing drives shape validation, the body
    // is forwarded semantically unchanged.
    let gemini_req = translation::gemini::transform_request(raw_body).map_err(wrap)?;
    validation::validate_gemini(&gemini_req).map_err(wrap)?;

    info!(
        model = %upstream_model,
        contents = gemini_req.contents.len(),
        stream,
        keys = keys.len(),
        "native generate request"
    );

    let endpoint = if stream {
        "/v1beta/models/:streamGenerateContent"
    } else {
        "/v1beta/models/:generateContent"
    };

    if stream {
        dispatch_streaming(
            &state,
            Protocol::Gemini,
            endpoint,
            &upstream_model,
            &keys,
            &gemini_req,
            GeminiStreamTranslator::new(),
        )
        .await
        .map_err(wrap)
    } else {
        let value = dispatch_blocking(
            &state,
            Protocol::Gemini,
            endpoint,
            &upstream_model,
            &keys,
            &gemini_req,
        )
        .await
        .map_err(wrap)?;

        let (input_tokens, output_tokens) = usage_from_value(&value);
        crate::metrics::record_tokens(
            &upstream_model,
            input_tokens.unwrap_or(0),
            output_tokens.unwrap_or(0),
        );

        let response = translation::gemini::passthrough_response(value).map_err(wrap)?;
        Ok(Json(response).into_response())
    }
}
