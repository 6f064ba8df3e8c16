// gemgate - Multi-protocol LLM API gateway for Google Gemini

pub mod balancer;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod relay;
pub mod server;
pub mod storage;
pub mod translation;
pub mod upstream;
pub mod utils;
pub mod validation;
