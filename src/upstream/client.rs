// Gemini API client

use crate::balancer::ApiKey;
use crate::config::UpstreamConfig;
use crate::error::{GatewayError, Result};
use crate::models::gemini::GenerateContentRequest;
use crate::utils::logging::sanitize;
use crate::utils::retry::with_retry;
use bytes::Bytes;
use futures::Stream;
use reqwest::Client;
use serde_json::Value;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, error};

/// Client for the Google Gemini API.
///
/// Holds one pooled HTTP client shared by all requests; the credential is
/// per-call, supplied by the key selector.
pub struct UpstreamClient {
    http_client: Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    /// Create a client with connection pooling tuned for streaming.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config: config.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Call `generateContent` (blocking).
    ///
    /// Retries retryable statuses with the same body and the same key, at
    /// most `max_retries` attempts, honoring upstream retry-delay hints.
    /// Key rotation across attempts is the caller's concern, not this
    /// client's.
    pub async fn generate_content(
        &self,
        model: &str,
        key: &ApiKey,
        request: &GenerateContentRequest,
    ) -> Result<Value> {
        let url = format!("{}/models/{}:generateContent", self.config.base_url, model);
        debug!(model, key = %key.masked(), "calling generateContent");

        let body = serde_json::to_string(request)
            .map_err(|e| GatewayError::Internal(format!("failed to serialize request: {}", e)))?;

        let client = self.http_client.clone();
        let api_key = key.expose().to_string();

        let response_text = with_retry("generateContent", self.config.max_retries, || {
            let client = client.clone();
            let url = url.clone();
            let body = body.clone();
            let api_key = api_key.clone();
            async move {
                let response = client
                    .post(&url)
                    .header("x-goog-api-key", api_key)
                    .header("Content-Type", "application/json")
                    .body(body)
                    .send()
                    .await
                    .map_err(|e| (0u16, e.to_string()))?;

                let status = response.status();
                let text = response
                    .text()
                    .await
                    .map_err(|e| (0u16, e.to_string()))?;

                if !status.is_success() {
                    return Err((status.as_u16(), text));
                }

                Ok(text)
            }
        })
        .await
        .map_err(|(status, body)| {
            let message = sanitize(&extract_error_message(&body).unwrap_or(body));
            error!(status, message = %message, "generateContent failed");
            if status == 0 {
                GatewayError::Network(message)
            } else {
                GatewayError::from_upstream_status(status, message)
            }
        })?;

        serde_json::from_str(&response_text).map_err(|e| {
            error!(error = %e, "failed to parse upstream response");
            GatewayError::UpstreamApi {
                status: 502,
                message: format!("response parsing error: {}", e),
            }
        })
    }

    /// Call `streamGenerateContent` and return the raw SSE byte stream.
    ///
    /// Streaming calls fail fast: a non-success status is surfaced
    /// immediately with the body read for the error message.
    pub async fn stream_generate_content(
        &self,
        model: &str,
        key: &ApiKey,
        request: &GenerateContentRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url, model
        );
        debug!(model, key = %key.masked(), "starting streamGenerateContent");

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", key.expose())
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = sanitize(&extract_error_message(&body).unwrap_or(body));
            error!(status = status.as_u16(), message = %message, "streamGenerateContent failed");
            return Err(GatewayError::from_upstream_status(status.as_u16(), message));
        }

        Ok(Box::pin(response.bytes_stream()))
    }
}

/// Pull the human-readable message out of a Gemini error body.
fn extract_error_message(response_text: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorResponse {
        error: Option<ErrorDetail>,
    }

    #[derive(serde::Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
        status: Option<String>,
    }

    if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(response_text) {
        if let Some(error) = error_resp.error {
            return error.message.or(error.status);
        }
    }
    None
}
