//! Structured logging setup and credential sanitization.
//!
//! Configures the `tracing` ecosystem for the gateway, supporting JSON output
//! for production ingestion and pretty output for development. Also provides
//! `sanitize`, which scrubs Google API key material out of free-form strings
//! (upstream error bodies sometimes echo the offending key back).

use crate::config::LoggingConfig;
use crate::error::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber.
///
/// Log levels are controlled via the `RUST_LOG` environment variable or the
/// provided `LoggingConfig`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

/// Scrub Google API keys from a string.
///
/// Google AI Studio keys start with `AIza` followed by 35 URL-safe characters.
/// Every occurrence is replaced with a placeholder so upstream error bodies
/// can be logged and forwarded without leaking the credential.
pub fn sanitize(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find("AIza") {
        result.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let end = tail
            .char_indices()
            .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .map(|(i, c)| i + c.len_utf8())
            .last()
            .unwrap_or(4);
        result.push_str("[REDACTED_API_KEY]");
        rest = &tail[end..];
    }

    result.push_str(rest);
    result
}
