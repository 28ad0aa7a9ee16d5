//! Conversation chain
//!
//! Pass-through from one user submission to one reply: assemble the prompt
//! from the session's window, record the user turn, call the provider, record
//! the reply.
//!
//! A failed call leaves the user turn in the transcript without a reply. The
//! next prompt therefore carries that unanswered question as history.

use sdk::errors::EngineError;
use sdk::types::Turn;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{assemble_prompt, ConversationMemory};
use crate::config::Config;
use crate::llm::{CompletionProvider, LLMError};

pub struct ConversationChain {
    provider: Arc<dyn CompletionProvider>,
    system_prompt: String,
    window_turns: usize,
    max_input_chars: usize,
    timeout_secs: u64,
}

impl ConversationChain {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        system_prompt: impl Into<String>,
        window_turns: usize,
        max_input_chars: usize,
        timeout_secs: u64,
    ) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.into(),
            window_turns,
            max_input_chars,
            timeout_secs,
        }
    }

    pub fn from_config(provider: Arc<dyn CompletionProvider>, config: &Config) -> Self {
        Self::new(
            provider,
            config.conversation.system_prompt.clone(),
            config.conversation.window_turns(),
            config.conversation.max_input_chars,
            config.llm.request_timeout_secs,
        )
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    /// Trim the submission and enforce the length limit
    pub fn validate_input<'a>(&self, input: &'a str) -> Result<&'a str, EngineError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InputRejected("message is empty".to_string()));
        }

        let chars = trimmed.chars().count();
        if chars > self.max_input_chars {
            return Err(EngineError::InputRejected(format!(
                "message has {} characters, the limit is {}",
                chars, self.max_input_chars
            )));
        }

        Ok(trimmed)
    }

    /// Answer `input` in the context of `memory`
    ///
    /// On success the transcript grows by two turns. On a provider failure it
    /// grows by one (the user turn) and the error is returned. Rejected input
    /// leaves it untouched.
    pub async fn predict(
        &self,
        memory: &mut ConversationMemory,
        input: &str,
    ) -> Result<String, EngineError> {
        let input = self.validate_input(input)?;

        let prompt = assemble_prompt(&self.system_prompt, memory.window(self.window_turns), input);
        memory.record(Turn::user(input));

        debug!(
            "Prompt assembled: {} messages ({} history turns)",
            prompt.len(),
            prompt.len() - 2
        );

        let call = self.provider.complete(&prompt);
        let reply = match tokio::time::timeout(Duration::from_secs(self.timeout_secs), call).await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("Completion via {} failed: {}", self.provider.name(), e);
                return Err(e.into());
            }
            Err(_) => {
                warn!(
                    "Completion via {} timed out after {}s",
                    self.provider.name(),
                    self.timeout_secs
                );
                return Err(LLMError::Timeout(self.timeout_secs).into());
            }
        };

        memory.record(Turn::assistant(reply.clone()));
        Ok(reply)
    }
}
