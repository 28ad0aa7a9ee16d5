//! Completion Client Adapter
//!
//! This module isolates the remote chat-completion call behind the
//! [`CompletionProvider`] trait. A provider takes the assembled prompt (system
//! instruction, history window, new user message) and returns the generated
//! reply text, or fails with an [`LLMError`]. Providers never retry; the caller
//! decides what a failure means for the transcript.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::{Role, Turn};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod openai;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during a completion call
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Provider returned {status}: {message}")]
    RemoteError { status: u16, message: String },

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<LLMError> for EngineError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::AuthenticationFailed(msg) => EngineError::Authentication(msg),
            LLMError::NetworkError(msg) => EngineError::Transport(msg),
            LLMError::Timeout(secs) => EngineError::Timeout(secs),
            LLMError::RemoteError { status, message } => EngineError::Remote { status, message },
            LLMError::ParseError(msg) => EngineError::MalformedResponse(msg),
        }
    }
}

/// Message in an assembled prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (system, user, assistant)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        match turn.role() {
            Role::User => Message::user(turn.content()),
            Role::Assistant => Message::assistant(turn.content()),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Fixed instruction placed first in the prompt
    System,

    /// User message
    User,

    /// Assistant message
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Completion provider trait
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "openai")
    fn name(&self) -> &str;

    /// Returns the target model identifier sent with every request
    fn model(&self) -> &str;

    /// Generate a reply for the assembled prompt
    ///
    /// # Arguments
    /// * `messages` - System instruction, history window and the new user message, in order
    ///
    /// # Returns
    /// * `Ok(String)` - The generated reply text
    /// * `Err(LLMError)` - If the request fails
    async fn complete(&self, messages: &[Message]) -> Result<String>;

    /// Check if the provider is usable
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, MessageRole::User);
        assert_eq!(user_msg.content, "Hello");

        let system_msg = Message::system("Answer truthfully");
        assert_eq!(system_msg.role, MessageRole::System);
    }

    #[test]
    fn test_message_from_turn() {
        let msg = Message::from(&Turn::assistant("Copyright protects expression"));
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.content, "Copyright protects expression");

        let msg = Message::from(&Turn::user("What about ideas?"));
        assert_eq!(msg.role, MessageRole::User);
    }

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_value(Message::system("x")).unwrap();
        assert_eq!(json["role"], "system");
    }

    #[test]
    fn test_error_conversion() {
        let err: EngineError = LLMError::AuthenticationFailed("bad key".to_string()).into();
        assert!(matches!(err, EngineError::Authentication(_)));

        let err: EngineError = LLMError::NetworkError("refused".to_string()).into();
        assert!(matches!(err, EngineError::Transport(_)));

        let err: EngineError = LLMError::Timeout(30).into();
        assert!(matches!(err, EngineError::Timeout(30)));

        let err: EngineError = LLMError::RemoteError {
            status: 500,
            message: "oops".to_string(),
        }
        .into();
        assert!(matches!(err, EngineError::Remote { status: 500, .. }));
    }
}
