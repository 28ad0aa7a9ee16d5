//! Conversation Memory
//!
//! Holds the transcript of one browser session and derives the prompt window
//! from it. The transcript is append-only and grows without bound; only the
//! window sent to the completion provider is bounded.
//!
//! Prompt order is fixed: system instruction first, then the window oldest to
//! newest, then the new user input.

pub mod chain;

pub use chain::ConversationChain;

use sdk::types::Turn;

use crate::llm::Message;

/// Append-only transcript of one session
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn to the transcript
    pub fn record(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// The last `k` turns, oldest first
    ///
    /// Returns every turn when the transcript is shorter than `k`.
    pub fn window(&self, k: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(k);
        &self.turns[start..]
    }

    /// Every recorded turn, oldest first
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// Build the prompt: system instruction, history window, then the new input
pub fn assemble_prompt(system_prompt: &str, window: &[Turn], input: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(window.len() + 2);
    messages.push(Message::system(system_prompt));
    messages.extend(window.iter().map(Message::from));
    messages.push(Message::user(input));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;

    fn memory_with(n: usize) -> ConversationMemory {
        let mut memory = ConversationMemory::new();
        for i in 1..=n {
            memory.record(Turn::user(format!("turn {i}")));
        }
        memory
    }

    #[test]
    fn test_window_returns_latest_turns_in_order() {
        let memory = memory_with(7);
        let window = memory.window(5);

        let contents: Vec<_> = window.iter().map(|t| t.content()).collect();
        assert_eq!(contents, ["turn 3", "turn 4", "turn 5", "turn 6", "turn 7"]);
        assert_eq!(memory.len(), 7);
    }

    #[test]
    fn test_window_shorter_transcript_returns_everything() {
        let memory = memory_with(3);
        assert_eq!(memory.window(5).len(), 3);
        assert_eq!(memory.window(3).len(), 3);
    }

    #[test]
    fn test_window_zero_is_empty() {
        let memory = memory_with(4);
        assert!(memory.window(0).is_empty());
        assert!(ConversationMemory::new().window(5).is_empty());
    }

    #[test]
    fn test_assemble_prompt_order() {
        let mut memory = ConversationMemory::new();
        memory.record(Turn::user("What is copyright?"));
        memory.record(Turn::assistant("A legal right."));

        let prompt = assemble_prompt("Be truthful", memory.window(10), "How long does it last?");

        let roles: Vec<_> = prompt.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User
            ]
        );
        assert_eq!(prompt[0].content, "Be truthful");
        assert_eq!(prompt[3].content, "How long does it last?");
    }

    #[test]
    fn test_clear_discards_transcript() {
        let mut memory = memory_with(2);
        memory.clear();
        assert!(memory.is_empty());
    }
}
