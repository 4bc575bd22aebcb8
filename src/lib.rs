//! chat-relay: streaming relay between a browser chat page and an
//! OpenAI-compatible completion API
//!
//! Features:
//! - HTML allow-listing and bounding of client chat histories
//! - Alternating user/assistant conversation building
//! - Incremental SSE forwarding with a single terminal frame per stream
//! - Provider failure classification into client-safe messages
//! - Per-stream stats logging

pub mod api;
pub mod config;
pub mod conversation;
pub mod provider;
pub mod relay;
pub mod sanitize;
pub mod stats;

pub use config::AppConfig;
pub use relay::run_server;
