//! Role-tagged conversation built from the sanitized client history

use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Role for a position in the history: even is user, odd is assistant
    pub fn for_index(index: usize) -> Self {
        if index % 2 == 0 {
            Role::User
        } else {
            Role::Assistant
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A client message that passed the sanitizer: markup allow-listed,
/// non-empty after trimming, within the character ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SanitizedMessage(String);

impl SanitizedMessage {
    /// Wrap text that is already known to be clean
    pub(crate) fn new_unchecked(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One role-tagged entry of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: SanitizedMessage,
}

/// Ordered message history sent to the completion provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent turn, used for request log previews
    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }
}

/// Tag each message with a role by position, preserving order.
pub fn build_conversation(messages: Vec<SanitizedMessage>) -> Conversation {
    let turns = messages
        .into_iter()
        .enumerate()
        .map(|(i, content)| ConversationTurn {
            role: Role::for_index(i),
            content,
        })
        .collect();
    Conversation { turns }
}
