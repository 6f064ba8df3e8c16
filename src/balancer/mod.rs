//! Client-supplied credential load balancing.
//!
//! Callers submit one or more Gemini API keys per request; the selector
//! tracks rolling per-key metrics and picks the best candidate using
//! health- and performance-aware scoring.
//!
//! - `key`: the `ApiKey` wrapper (zeroized on drop, masked in logs).
//! - `metrics`: per-credential rolling counters and health state.
//! - `selector`: the scoring and selection service object.

mod key;
mod metrics;
mod selector;

pub use key::ApiKey;
pub use metrics::{KeyMetrics, KeySummary};
pub use selector::{KeySelector, Selection, SelectionReason};
