//! In-memory provider replaying a fixed script, used as a test double

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{ChunkStream, CompletionProvider, ProviderError};
use crate::config::CompletionConfig;
use crate::conversation::Conversation;

/// One step of a scripted completion
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    Chunk(String),
    /// Fail mid-stream with this provider message
    Fail(String),
}

/// Provider that replays the same script for every call and records what it was sent
pub struct ScriptedProvider {
    connect_error: Option<String>,
    steps: Vec<ScriptStep>,
    calls: AtomicUsize,
    last_conversation: Mutex<Option<Conversation>>,
    last_params: Mutex<Option<CompletionConfig>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            connect_error: None,
            steps,
            calls: AtomicUsize::new(0),
            last_conversation: Mutex::new(None),
            last_params: Mutex::new(None),
        }
    }

    /// Stream the given chunks, then end normally
    pub fn with_chunks(chunks: &[&str]) -> Self {
        Self::new(chunks.iter().map(|c| ScriptStep::Chunk(c.to_string())).collect())
    }

    /// Fail while opening the stream
    pub fn failing_on_connect(message: &str) -> Self {
        Self {
            connect_error: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    /// Number of completions requested so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_conversation(&self) -> Option<Conversation> {
        self.last_conversation.lock().ok().and_then(|c| c.clone())
    }

    pub fn last_params(&self) -> Option<CompletionConfig> {
        self.last_params.lock().ok().and_then(|p| *p)
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn stream_completion(
        &self,
        conversation: &Conversation,
        params: &CompletionConfig,
    ) -> Result<ChunkStream, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_conversation.lock() {
            *last = Some(conversation.clone());
        }
        if let Ok(mut last) = self.last_params.lock() {
            *last = Some(*params);
        }

        if let Some(ref message) = self.connect_error {
            return Err(ProviderError::Stream(message.clone()));
        }

        let items: Vec<Result<String, ProviderError>> = self
            .steps
            .iter()
            .map(|step| match step {
                ScriptStep::Chunk(text) => Ok(text.clone()),
                ScriptStep::Fail(message) => Err(ProviderError::Stream(message.clone())),
            })
            .collect();

        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn probe(&self) -> Result<usize, ProviderError> {
        match self.connect_error {
            Some(ref message) => Err(ProviderError::Stream(message.clone())),
            None => Ok(1),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_replays_script_and_records_calls() {
        let provider = ScriptedProvider::new(vec![
            ScriptStep::Chunk("a".to_string()),
            ScriptStep::Fail("boom".to_string()),
        ]);
        let conversation = Conversation::default();

        let stream = provider
            .stream_completion(&conversation, &CompletionConfig::default())
            .await
            .unwrap();
        let items: Vec<_> = stream.collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        assert!(items[1].is_err());
        assert_eq!(provider.calls(), 1);
        assert_eq!(provider.last_conversation(), Some(conversation));
        assert_eq!(provider.last_params(), Some(CompletionConfig::default()));
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let provider = ScriptedProvider::failing_on_connect("invalid_api_key");
        let result = provider
            .stream_completion(&Conversation::default(), &CompletionConfig::default())
            .await;
        assert!(result.is_err());
        assert!(provider.probe().await.is_err());
        assert_eq!(provider.calls(), 1);
    }
}
