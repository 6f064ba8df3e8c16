//! Upstream Gemini API client.
//!
//! Speaks the public `generativelanguage.googleapis.com` surface:
//! `models/{model}:generateContent` for blocking calls and
//! `models/{model}:streamGenerateContent?alt=sse` for streaming, with the
//! selected caller credential passed in the `x-goog-api-key` header.

mod client;

pub use client::UpstreamClient;
