//! Shared types for the e2e test framework

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A mock response the provider will serve for the next request to /v1/chat/completions
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub content_type: String,
}

impl MockResponse {
    /// Streaming completion that emits each chunk as one delta, then [DONE]
    pub fn sse_chunks(chunks: &[&str]) -> Self {
        let mut body = String::new();
        body.push_str(&sse_data(&serde_json::json!({
            "id": "chatcmpl-e2e",
            "object": "chat.completion.chunk",
            "created": 1700000000,
            "model": "e2e-model",
            "choices": [{"index": 0, "delta": {"role": "assistant"}, "finish_reason": null}]
        })));
        for chunk in chunks {
            body.push_str(&sse_data(&serde_json::json!({
                "id": "chatcmpl-e2e",
                "object": "chat.completion.chunk",
                "created": 1700000000,
                "model": "e2e-model",
                "choices": [{"index": 0, "delta": {"content": chunk}, "finish_reason": null}]
            })));
        }
        body.push_str(&sse_data(&serde_json::json!({
            "id": "chatcmpl-e2e",
            "object": "chat.completion.chunk",
            "created": 1700000000,
            "model": "e2e-model",
            "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]
        })));
        body.push_str("data: [DONE]\n\n");

        Self {
            status: 200,
            body,
            content_type: "text/event-stream".to_string(),
        }
    }

    /// Raw SSE body, served as-is
    pub fn sse_raw(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_type: "text/event-stream".to_string(),
        }
    }

    /// OpenAI-style error response
    pub fn error(status: u16, message: &str, error_type: &str, code: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({
                "error": {"message": message, "type": error_type, "param": null, "code": code}
            })
            .to_string(),
            content_type: "application/json".to_string(),
        }
    }
}

fn sse_data(value: &serde_json::Value) -> String {
    format!("data: {}\n\n", value)
}

/// Shared state for the mock provider server
#[derive(Debug, Default)]
pub struct BackendState {
    /// Queue of responses to serve - tests push responses, the mock pops and serves them
    pub response_queue: VecDeque<MockResponse>,
    /// All completion requests received by the mock (for inspection)
    pub received_requests: Vec<ReceivedRequest>,
}

/// A completion request received by the mock provider
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

impl ReceivedRequest {
    /// (role, content) pairs of the forwarded conversation
    pub fn messages(&self) -> Vec<(String, String)> {
        self.body
            .get("messages")
            .and_then(|m| m.as_array())
            .map(|messages| {
                messages
                    .iter()
                    .map(|m| {
                        let field = |name: &str| m.get(name).and_then(|v| v.as_str()).unwrap_or_default().to_string();
                        (field("role"), field("content"))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub type SharedBackendState = Arc<Mutex<BackendState>>;

/// One frame of the relay's event stream
#[derive(Debug, Clone, PartialEq)]
pub enum RelayFrame {
    Chunk(String),
    Done,
    Error(String),
}

/// Response to a /prompt request
#[derive(Debug)]
pub struct PromptResponse {
    pub status: u16,
    pub content_type: String,
    pub headers: reqwest::header::HeaderMap,
    pub body: String,
    pub frames: Vec<RelayFrame>,
}

impl PromptResponse {
    /// Check that the stream ends with [DONE]
    pub fn has_done_marker(&self) -> bool {
        matches!(self.frames.last(), Some(RelayFrame::Done))
    }

    /// The ERROR payload, if the stream ended with one
    pub fn error_frame(&self) -> Option<&str> {
        match self.frames.last() {
            Some(RelayFrame::Error(message)) => Some(message),
            _ => None,
        }
    }

    /// Concatenated chunk payloads with `\n` escapes expanded, as the chat page does
    pub fn text(&self) -> String {
        self.frames
            .iter()
            .filter_map(|f| match f {
                RelayFrame::Chunk(text) => Some(text.replace("\\n", "\n")),
                _ => None,
            })
            .collect()
    }

    /// `error` field of a JSON error body
    pub fn json_error(&self) -> Option<String> {
        let json: serde_json::Value = serde_json::from_str(&self.body).ok()?;
        json.get("error")?.as_str().map(str::to_string)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Result of a single test case
#[derive(Debug)]
#[allow(dead_code)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
