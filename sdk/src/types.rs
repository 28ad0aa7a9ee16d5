//! Conversation turn types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a turn in the transcript
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text typed by the person using the assistant
    User,

    /// Reply generated by the completion provider
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Label shown next to the message in the chat view
    pub fn display_label(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Bot",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation
///
/// Turns are immutable once created: fields are private and only readable
/// through accessors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_creation() {
        let user = Turn::user("What is fair use?");
        assert_eq!(user.role(), Role::User);
        assert_eq!(user.content(), "What is fair use?");

        let reply = Turn::assistant("I don't know");
        assert_eq!(reply.role(), Role::Assistant);
        assert_eq!(reply.content(), "I don't know");
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::User.display_label(), "You");
        assert_eq!(Role::Assistant.display_label(), "Bot");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn test_turn_serializes_with_lowercase_role() {
        let json = serde_json::to_value(Turn::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");
    }
}
