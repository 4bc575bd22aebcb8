//! Metrics collection for one relayed stream

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use uuid::Uuid;

/// How a relayed stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayOutcome {
    /// At least one chunk forwarded, then `[DONE]`
    Completed,
    /// Provider finished without producing any content
    EmptyResponse,
    /// Provider failed during setup or mid-stream
    ProviderError,
}

impl RelayOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayOutcome::Completed => "completed",
            RelayOutcome::EmptyResponse => "empty_response",
            RelayOutcome::ProviderError => "provider_error",
        }
    }
}

/// Collected metrics for a /prompt request
#[derive(Debug, Clone, Serialize)]
pub struct RelayMetrics {
    /// Unique request ID
    pub request_id: String,
    /// Timestamp of the request
    pub timestamp: DateTime<Utc>,
    /// Client address
    pub origin: String,
    /// Messages in the submitted history
    pub received_messages: usize,
    /// Turns sent to the provider
    pub conversation_turns: usize,
    /// Content chunks forwarded to the client
    pub chunks: usize,
    /// Characters of generated text forwarded
    pub output_chars: usize,
    /// Time until the first chunk was forwarded
    pub first_chunk_ms: Option<f64>,
    /// Request duration in ms
    pub duration_ms: f64,
    pub outcome: Option<RelayOutcome>,
    /// Classified provider failure, if any
    pub error_category: Option<String>,
    #[serde(skip)]
    started: Option<Instant>,
}

impl RelayMetrics {
    /// Start measuring a request
    pub fn start(origin: impl Into<String>, received_messages: usize, conversation_turns: usize) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            origin: origin.into(),
            received_messages,
            conversation_turns,
            chunks: 0,
            output_chars: 0,
            first_chunk_ms: None,
            duration_ms: 0.0,
            outcome: None,
            error_category: None,
            started: Some(Instant::now()),
        }
    }

    fn elapsed_ms(&self) -> f64 {
        self.started
            .map(|s| s.elapsed().as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }

    /// Record one forwarded chunk
    pub fn record_chunk(&mut self, text: &str) {
        if self.first_chunk_ms.is_none() {
            self.first_chunk_ms = Some(self.elapsed_ms());
        }
        self.chunks += 1;
        self.output_chars += text.chars().count();
    }

    /// Record the terminal state of the stream
    pub fn finish(&mut self, outcome: RelayOutcome, error_category: Option<&str>) {
        self.duration_ms = self.elapsed_ms();
        self.outcome = Some(outcome);
        self.error_category = error_category.map(str::to_string);
    }

    /// Output characters per second of generation, after the first chunk
    pub fn chars_per_second(&self) -> f64 {
        match self.first_chunk_ms {
            Some(first) if self.duration_ms > first => {
                self.output_chars as f64 / ((self.duration_ms - first) / 1000.0)
            }
            _ => 0.0,
        }
    }
}
