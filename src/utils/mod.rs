//! Cross-cutting utilities for the gateway.
//!
//! - `logging`: tracing initialization and credential sanitization.
//! - `masking`: API-key masking and hashing for logs, metrics and persistence.
//! - `retry`: capped retry loop that honors upstream retry hints.

pub mod logging;
pub mod masking;
pub mod retry;
