//! Mock OpenAI-compatible provider
//!
//! Serves the two endpoints the relay calls. Streaming bodies are written one
//! SSE record at a time so the relay sees a genuinely incremental response.
//! Tests queue completion responses via SharedBackendState before each request.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use std::convert::Infallible;
use std::time::Duration;

use crate::types::{BackendState, MockResponse, ReceivedRequest, SharedBackendState};

/// Gap between streamed SSE records
const RECORD_DELAY: Duration = Duration::from_millis(5);

async fn chat_completions(
    State(state): State<SharedBackendState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = ReceivedRequest {
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    };

    let mock = {
        let mut state = state.lock().unwrap();
        state.received_requests.push(request);
        state.response_queue.pop_front()
    }
    .unwrap_or_else(|| MockResponse::sse_chunks(&["Default response (no mock queued)"]));

    let status = StatusCode::from_u16(mock.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = if mock.content_type == "text/event-stream" {
        streamed_records(mock.body)
    } else {
        Body::from(mock.body)
    };

    (status, [(header::CONTENT_TYPE, mock.content_type)], body).into_response()
}

/// Split an SSE body into records and emit them with a short delay between each
fn streamed_records(body: String) -> Body {
    let records: Vec<String> = body
        .split_inclusive("\n\n")
        .map(str::to_string)
        .collect();

    let stream = futures::stream::iter(records).then(|record| async move {
        tokio::time::sleep(RECORD_DELAY).await;
        Ok::<_, Infallible>(Bytes::from(record))
    });
    Body::from_stream(stream)
}

/// GET /v1/models, used by the relay's startup probe
async fn models() -> impl IntoResponse {
    Json(serde_json::json!({
        "object": "list",
        "data": [{"id": "e2e-model", "object": "model", "created": 1700000000, "owned_by": "e2e"}]
    }))
}

/// Bind the mock provider on 127.0.0.1 and return its shared state
pub async fn start(port: u16) -> anyhow::Result<SharedBackendState> {
    let state = SharedBackendState::default();

    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/models", get(models))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind mock provider to port {}: {}", port, e))?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("Mock provider stopped: {}", e);
        }
    });

    Ok(state)
}

/// Queue the response for the next completion request
pub fn queue_response(state: &SharedBackendState, response: MockResponse) {
    state.lock().unwrap().response_queue.push_back(response);
}

/// Take every completion request received since the last reset
pub fn drain_requests(state: &SharedBackendState) -> Vec<ReceivedRequest> {
    std::mem::take(&mut state.lock().unwrap().received_requests)
}

impl BackendState {
    pub fn reset(&mut self) {
        self.response_queue.clear();
        self.received_requests.clear();
    }
}
