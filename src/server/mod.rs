//! Axum-based HTTP server for the gateway.
//!
//! Exposes the three inbound protocol surfaces and the operational
//! endpoints, and wires shared services (upstream client, key selector,
//! request store) into handlers through `AppState`.
//!
//! # Components
//!
//! - `handlers`: the per-protocol endpoints plus health and metrics.
//! - `middleware`: request-id tracking layers.
//! - `routes`: the router configuration tying everything together.

mod handlers;
mod middleware;
mod routes;

pub use routes::{create_router, AppState};
