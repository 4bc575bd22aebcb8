//! Completion provider abstraction
//!
//! The relay treats the upstream model API as an opaque capability: submit a
//! conversation, receive an ordered, finite stream of text chunks that may
//! fail at any point.

mod classify;
mod openai;
mod scripted;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::config::CompletionConfig;
use crate::conversation::Conversation;

pub use classify::{classify, ErrorCategory};
pub use openai::OpenAiProvider;
pub use scripted::{ScriptStep, ScriptedProvider};

/// Ordered text fragments from one completion; not restartable
pub type ChunkStream = BoxStream<'static, Result<String, ProviderError>>;

/// Failure raised by a provider during call setup or mid-stream
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request to provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed stream payload: {0}")]
    Decode(String),

    #[error("{0}")]
    Stream(String),
}

impl ProviderError {
    /// Category used to pick the message shown to the client
    pub fn category(&self) -> ErrorCategory {
        classify(&self.to_string())
    }
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Open a streaming completion for the conversation
    async fn stream_completion(
        &self,
        conversation: &Conversation,
        params: &CompletionConfig,
    ) -> Result<ChunkStream, ProviderError>;

    /// Cheap connectivity check, returns the number of models visible to the credential
    async fn probe(&self) -> Result<usize, ProviderError>;

    /// Provider name (for logging)
    fn name(&self) -> &str;
}
