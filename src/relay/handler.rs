//! HTTP handlers for the chat page, health check and /prompt

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde_json::Value;
use std::net::SocketAddr;

use super::error::RelayError;
use super::server::RelayState;
use super::streaming::relay_stream;
use crate::conversation::build_conversation;
use crate::stats::{format_request_log, RelayMetrics};

/// Embedded single-page chat UI
const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Serve the chat page
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint
pub async fn health_handler() -> &'static str {
    "OK"
}

/// Accept a chat history and stream the model's reply as SSE
pub async fn prompt_handler(
    State(state): State<RelayState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    req: Request,
) -> Result<Response, RelayError> {
    let origin = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let body_bytes = to_bytes(req.into_body(), state.config.limits.max_body_bytes)
        .await
        .map_err(|e| {
            if is_length_limit(&e) {
                RelayError::PayloadTooLarge
            } else {
                RelayError::Internal(format!("failed to read request body: {}", e))
            }
        })?;

    let body: Value = serde_json::from_slice(&body_bytes).map_err(|e| {
        tracing::debug!(error = %e, "Request body is not JSON");
        RelayError::MissingInput
    })?;
    if !body.is_object() {
        return Err(RelayError::MissingInput);
    }

    let history = state.sanitizer.sanitize_history(&body)?;
    if history.dropped() > 0 {
        tracing::debug!(
            received = history.received,
            kept = history.messages.len(),
            "Dropped messages during sanitizing"
        );
    }

    let received = history.received;
    let conversation = build_conversation(history.messages);
    tracing::info!("{}", format_request_log(&origin, received, &conversation));

    let metrics = RelayMetrics::start(origin, received, conversation.len());
    let stream = relay_stream(
        state.provider.clone(),
        conversation,
        state.config.completion,
        metrics,
        state.config.stats.clone(),
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(Body::from_stream(stream))
        .map_err(|e| RelayError::Internal(format!("failed to build stream response: {}", e)))
}

/// Fallback for unknown routes
pub async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, axum::Json(serde_json::json!({ "error": "Not found" })))
}

fn is_length_limit(error: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return true;
        }
        source = err.source();
    }
    false
}
