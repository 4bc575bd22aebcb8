//! HTTP client that talks to the relay the way the chat page does

use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;

use crate::types::{PromptResponse, RelayFrame};

/// Build an HTTP client (no connection pooling for test isolation)
pub fn build_client() -> Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .pool_max_idle_per_host(0)
        .build()
        .expect("Failed to build reqwest client")
}

/// POST a chat history to /prompt
pub async fn send_history(client: &Client, relay_addr: &str, history: &[&str]) -> anyhow::Result<PromptResponse> {
    send_prompt(client, relay_addr, serde_json::json!({ "chatHistory": history }).to_string()).await
}

/// POST a raw body to /prompt and collect the whole response
pub async fn send_prompt(client: &Client, relay_addr: &str, body: String) -> anyhow::Result<PromptResponse> {
    let url = format!("http://{relay_addr}/prompt");

    let resp = client
        .post(&url)
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send request to relay: {}", e))?;

    let status = resp.status().as_u16();
    let headers = resp.headers().clone();
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    // Collect all bytes from the stream
    let mut stream = resp.bytes_stream();
    let mut all_bytes: Vec<u8> = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk: Bytes = chunk.map_err(|e| anyhow::anyhow!("Stream read error: {}", e))?;
        all_bytes.extend_from_slice(&chunk);
    }

    let body = String::from_utf8_lossy(&all_bytes).to_string();
    let frames = if content_type.contains("text/event-stream") {
        parse_frames(&body)
    } else {
        Vec::new()
    };

    Ok(PromptResponse {
        status,
        content_type,
        headers,
        body,
        frames,
    })
}

/// Parse the relay's SSE body into frames
///
/// Each frame is a single `data: <payload>` line followed by a blank line.
fn parse_frames(text: &str) -> Vec<RelayFrame> {
    text.split("\n\n")
        .filter_map(|raw| raw.strip_prefix("data: "))
        .map(|data| {
            if data == "[DONE]" {
                RelayFrame::Done
            } else if let Some(message) = data.strip_prefix("ERROR:") {
                RelayFrame::Error(message.to_string())
            } else {
                RelayFrame::Chunk(data.to_string())
            }
        })
        .collect()
}

/// Send a GET request to the relay, returning status, headers and body text
pub async fn send_get(
    client: &Client,
    relay_addr: &str,
    path: &str,
) -> anyhow::Result<(u16, reqwest::header::HeaderMap, String)> {
    let url = format!("http://{relay_addr}{path}");

    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to GET {}: {}", url, e))?;

    let status = resp.status().as_u16();
    let headers = resp.headers().clone();
    let body = resp.text().await.unwrap_or_default();

    Ok((status, headers, body))
}
