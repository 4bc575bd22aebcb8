//! Forwarding provider chunks to the client as SSE frames

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::{CompletionConfig, StatsConfig};
use crate::conversation::Conversation;
use crate::provider::{ChunkStream, CompletionProvider, ProviderError};
use crate::stats::{format_metrics, RelayMetrics, RelayOutcome};

/// Sent in place of `[DONE]` when the provider produced no content
pub const EMPTY_RESPONSE_MESSAGE: &str = "No response was generated by the model";

/// Make a payload safe for a single `data:` line.
/// Newlines become the two characters `\n`, carriage returns are dropped.
pub fn escape_chunk(text: &str) -> String {
    text.replace('\r', "").replace('\n', "\\n")
}

/// One frame on the client event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Chunk(String),
    Done,
    Error(String),
}

impl RelayEvent {
    pub fn to_frame(&self) -> Bytes {
        let frame = match self {
            RelayEvent::Chunk(text) => format!("data: {}\n\n", escape_chunk(text)),
            RelayEvent::Done => "data: [DONE]\n\n".to_string(),
            RelayEvent::Error(message) => format!("data: ERROR:{}\n\n", escape_chunk(message)),
        };
        Bytes::from(frame)
    }
}

enum RelayStage {
    /// Provider not called yet; the call happens on first poll
    Connecting {
        provider: Arc<dyn CompletionProvider>,
        conversation: Conversation,
        params: CompletionConfig,
    },
    Streaming {
        chunks: ChunkStream,
    },
    Closed,
}

/// Drives one provider completion and yields exactly one terminal frame
struct Forwarder {
    stage: RelayStage,
    metrics: RelayMetrics,
    stats: StatsConfig,
    finished: bool,
}

impl Forwarder {
    async fn next_event(&mut self) -> Option<RelayEvent> {
        loop {
            match std::mem::replace(&mut self.stage, RelayStage::Closed) {
                RelayStage::Connecting {
                    provider,
                    conversation,
                    params,
                } => {
                    tracing::debug!(
                        provider = provider.name(),
                        turns = conversation.len(),
                        "Calling provider"
                    );
                    match provider.stream_completion(&conversation, &params).await {
                        Ok(chunks) => self.stage = RelayStage::Streaming { chunks },
                        Err(e) => return Some(self.fail(e)),
                    }
                }
                RelayStage::Streaming { mut chunks } => match chunks.next().await {
                    Some(Ok(text)) => {
                        self.stage = RelayStage::Streaming { chunks };
                        if text.is_empty() {
                            continue;
                        }
                        self.metrics.record_chunk(&text);
                        return Some(RelayEvent::Chunk(text));
                    }
                    Some(Err(e)) => return Some(self.fail(e)),
                    None if self.metrics.chunks > 0 => {
                        self.finish(RelayOutcome::Completed, None);
                        return Some(RelayEvent::Done);
                    }
                    None => {
                        tracing::warn!("Provider stream ended without content");
                        self.finish(RelayOutcome::EmptyResponse, None);
                        return Some(RelayEvent::Error(EMPTY_RESPONSE_MESSAGE.to_string()));
                    }
                },
                RelayStage::Closed => return None,
            }
        }
    }

    fn fail(&mut self, error: ProviderError) -> RelayEvent {
        let raw = error.to_string();
        let category = error.category();
        tracing::error!(
            category = category.as_str(),
            chunks_sent = self.metrics.chunks,
            "Provider error: {}",
            raw
        );
        self.finish(RelayOutcome::ProviderError, Some(category.as_str()));
        RelayEvent::Error(category.client_message(&raw))
    }

    fn finish(&mut self, outcome: RelayOutcome, category: Option<&str>) {
        self.finished = true;
        self.metrics.finish(outcome, category);
        if self.stats.enabled {
            tracing::info!("{}", format_metrics(&self.metrics, self.stats.format));
        }
    }
}

impl Drop for Forwarder {
    fn drop(&mut self) {
        if !self.finished {
            tracing::info!(
                request_id = %self.metrics.request_id,
                chunks_sent = self.metrics.chunks,
                "Client disconnected before the stream finished"
            );
        }
    }
}

/// Build the client event stream for one conversation.
///
/// Nothing is requested from the provider until the stream is first polled,
/// so the response headers are already committed when provider errors occur.
pub fn relay_stream(
    provider: Arc<dyn CompletionProvider>,
    conversation: Conversation,
    params: CompletionConfig,
    metrics: RelayMetrics,
    stats: StatsConfig,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    let forwarder = Forwarder {
        stage: RelayStage::Connecting {
            provider,
            conversation,
            params,
        },
        metrics,
        stats,
        finished: false,
    };

    futures::stream::unfold(forwarder, |mut forwarder| async move {
        let event = forwarder.next_event().await?;
        Some((Ok(event.to_frame()), forwarder))
    })
}
