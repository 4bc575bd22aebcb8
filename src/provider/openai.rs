//! OpenAI-compatible streaming provider over reqwest

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header;
use std::time::Duration;

use super::{ChunkStream, CompletionProvider, ProviderError};
use crate::api::{ApiError, ChatCompletionRequest, ErrorEnvelope, ModelList, StreamChunk};
use crate::config::{CompletionConfig, ProviderConfig};
use crate::conversation::Conversation;

/// Longest slice of an upstream body quoted in error messages
const ERROR_BODY_PREVIEW: usize = 500;

/// Provider speaking the OpenAI chat completions protocol
pub struct OpenAiProvider {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let api_key = config
            .credential()
            .ok_or("provider API key is not configured")?
            .to_string();

        Ok(Self {
            http_client: build_http_client(config)?,
            base_url: config.base_url().to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    /// Accepts base URLs both with and without the /v1 suffix
    fn endpoint(&self, path: &str) -> String {
        if self.base_url.ends_with("/v1") {
            format!("{}/{}", self.base_url, path)
        } else {
            format!("{}/v1/{}", self.base_url, path)
        }
    }

    async fn status_error(response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let body = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => envelope.error.to_string(),
            Err(_) => preview(&body).to_string(),
        };
        ProviderError::Status { status, body }
    }
}

/// Build an HTTP client with TLS configuration.
/// No overall timeout unless configured: a stream lasts as long as generation.
fn build_http_client(config: &ProviderConfig) -> Result<reqwest::Client, Box<dyn std::error::Error>> {
    let mut client_builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .pool_max_idle_per_host(10);

    if let Some(timeout) = config.timeout_seconds {
        client_builder = client_builder.timeout(Duration::from_secs(timeout));
    }

    if let Some(ref tls) = config.tls {
        if tls.accept_invalid_certs {
            client_builder = client_builder.danger_accept_invalid_certs(true);
            tracing::warn!("TLS: Accepting invalid certificates (use only for development/testing)");
        }

        if let Some(ref ca_path) = tls.ca_cert_path {
            let ca_cert = std::fs::read(ca_path)?;
            let ca_cert = reqwest::Certificate::from_pem(&ca_cert)?;
            client_builder = client_builder.add_root_certificate(ca_cert);
            tracing::info!("TLS: Loaded custom CA certificate from {}", ca_path);
        }
    }

    Ok(client_builder.build()?)
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn stream_completion(
        &self,
        conversation: &Conversation,
        params: &CompletionConfig,
    ) -> Result<ChunkStream, ProviderError> {
        let request = ChatCompletionRequest::streaming(&self.model, conversation, params);
        let url = self.endpoint("chat/completions");

        tracing::debug!(
            url = %url,
            model = %self.model,
            turns = conversation.len(),
            "Opening streaming completion"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        // `None` marks the end of the body so a trailing unterminated record is flushed
        let mut decoder = SseDecoder::default();
        let items = response
            .bytes_stream()
            .map(Some)
            .chain(futures::stream::once(futures::future::ready(None)))
            .flat_map(move |read| {
                let items = match read {
                    Some(Ok(bytes)) => decoder.feed(&bytes),
                    Some(Err(e)) => vec![SseItem::Failed(ProviderError::Http(e))],
                    None => decoder.finish(),
                };
                futures::stream::iter(items)
            });

        let chunks = items
            .take_while(|item| futures::future::ready(!matches!(item, SseItem::Done)))
            .filter_map(|item| {
                futures::future::ready(match item {
                    SseItem::Content(text) => Some(Ok(text)),
                    SseItem::Failed(e) => Some(Err(e)),
                    SseItem::Done => None,
                })
            });

        Ok(chunks.boxed())
    }

    async fn probe(&self) -> Result<usize, ProviderError> {
        let url = self.endpoint("models");
        let response = self.http_client.get(&url).bearer_auth(&self.api_key).send().await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let models: ModelList = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("model list: {}", e)))?;
        Ok(models.data.len())
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// One decoded SSE record from the provider
#[derive(Debug)]
enum SseItem {
    Content(String),
    Done,
    Failed(ProviderError),
}

/// Incremental decoder for the provider's SSE byte stream.
///
/// Bytes are buffered until a full line is available, so records and UTF-8
/// sequences split across network reads decode correctly.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed raw bytes, returning every item completed by them
    fn feed(&mut self, bytes: &[u8]) -> Vec<SseItem> {
        self.buffer.extend_from_slice(bytes);

        let mut items = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(item) = decode_line(line.trim_end_matches(|c: char| c == '\n' || c == '\r')) {
                items.push(item);
            }
        }
        items
    }

    /// Decode whatever is left once the body has ended
    fn finish(&mut self) -> Vec<SseItem> {
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest);
        decode_line(line.trim_end_matches('\r')).into_iter().collect()
    }
}

fn decode_line(line: &str) -> Option<SseItem> {
    // Comments, event names and blank separators carry no content
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        return None;
    }
    if data == "[DONE]" {
        return Some(SseItem::Done);
    }

    tracing::trace!("Provider SSE data: {}", data);

    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            return Some(SseItem::Failed(ProviderError::Decode(format!(
                "{}: {}",
                e,
                preview(data)
            ))))
        }
    };

    if let Some(error) = value.get("error") {
        let message = serde_json::from_value::<ApiError>(error.clone())
            .map(|e| e.to_string())
            .unwrap_or_else(|_| error.to_string());
        return Some(SseItem::Failed(ProviderError::Stream(message)));
    }

    match serde_json::from_value::<StreamChunk>(value) {
        Ok(chunk) => chunk.content().map(|text| SseItem::Content(text.to_string())),
        Err(e) => Some(SseItem::Failed(ProviderError::Decode(e.to_string()))),
    }
}

fn preview(s: &str) -> &str {
    match s.char_indices().nth(ERROR_BODY_PREVIEW) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
