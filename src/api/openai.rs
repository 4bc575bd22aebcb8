//! OpenAI-compatible API type definitions

use serde::{Deserialize, Serialize};

use crate::config::CompletionConfig;
use crate::conversation::{Conversation, Role};

/// Streaming chat completion request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub stream: bool,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub presence_penalty: Option<f32>,
    #[serde(default)]
    pub frequency_penalty: Option<f32>,
}

impl ChatCompletionRequest {
    /// Build a streaming request for a conversation with the configured tuning
    pub fn streaming(model: &str, conversation: &Conversation, params: &CompletionConfig) -> Self {
        Self {
            model: model.to_string(),
            messages: conversation
                .turns()
                .iter()
                .map(|turn| Message {
                    role: turn.role,
                    content: turn.content.as_str().to_string(),
                })
                .collect(),
            stream: true,
            max_tokens: Some(params.max_tokens),
            temperature: Some(params.temperature),
            presence_penalty: Some(params.presence_penalty),
            frequency_penalty: Some(params.frequency_penalty),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Streaming chunk
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

impl StreamChunk {
    /// Text content carried by the first choice, if any
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .filter(|c| !c.is_empty())
    }
}

/// Streaming choice
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Streaming delta
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Delta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Error body returned by the API, both as a non-2xx body and inside a stream
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorEnvelope {
    pub error: ApiError,
}

/// Error detail
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref t) = self.error_type {
            write!(f, " (type: {})", t)?;
        }
        match self.code {
            Some(serde_json::Value::String(ref code)) => write!(f, " (code: {})", code),
            Some(serde_json::Value::Null) | None => Ok(()),
            Some(ref other) => write!(f, " (code: {})", other),
        }
    }
}

/// Response of GET /v1/models
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelList {
    #[serde(default)]
    pub data: Vec<ModelInfo>,
}

/// Model entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelInfo {
    pub id: String,
}
