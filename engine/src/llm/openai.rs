use super::{CompletionProvider, LLMError, Message};
use crate::config::LLMConfig;
use crate::secrets::{scrub_known, SecretString};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// OpenAI-compatible chat-completions client
pub struct OpenAIProvider {
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Build a provider from config. `api_key` is `None` when no credential
    /// could be loaded; every call then fails with `AuthenticationFailed`.
    pub fn new(config: &LLMConfig, api_key: Option<SecretString>) -> super::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LLMError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            timeout_secs: config.request_timeout_secs,
            client,
        })
    }

    fn scrubbed(&self, text: &str) -> String {
        match &self.api_key {
            Some(key) => scrub_known(text, key),
            None => crate::secrets::scrub(text),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn check_health(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    async fn complete(&self, messages: &[Message]) -> super::Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LLMError::AuthenticationFailed("No API key configured".to_string()))?;

        let url = format!("{}/chat/completions", self.base_url);

        let api_messages: Vec<_> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.to_string(),
                    "content": msg.content
                })
            })
            .collect();

        let payload = json!({
            "model": self.model,
            "messages": api_messages,
        });

        tracing::debug!(
            "Sending {} messages to {} ({})",
            messages.len(),
            self.name(),
            self.model
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key.unsecure()))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout(self.timeout_secs)
                } else {
                    LLMError::NetworkError(self.scrubbed(&e.to_string()))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = self.scrubbed(&response.text().await.unwrap_or_default());

            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(LLMError::AuthenticationFailed(text));
            }
            return Err(LLMError::RemoteError {
                status: status.as_u16(),
                message: extract_error_message(&text),
            });
        }

        let data: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LLMError::Timeout(self.timeout_secs)
            } else {
                LLMError::ParseError(e.to_string())
            }
        })?;

        let choice = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| LLMError::ParseError("No choices in response".to_string()))?;

        let message = choice
            .get("message")
            .ok_or_else(|| LLMError::ParseError("No message in choice".to_string()))?;

        match message.get("content").and_then(|c| c.as_str()) {
            Some(content) => Ok(content.trim().to_string()),
            None => Err(LLMError::ParseError("Empty content".to_string())),
        }
    }
}

/// Pull `error.message` out of an OpenAI error body, falling back to the raw text
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message_from_json() {
        let body = r#"{"error": {"message": "The server is overloaded", "type": "server_error"}}"#;
        assert_eq!(extract_error_message(body), "The server is overloaded");
    }

    #[test]
    fn test_extract_error_message_falls_back_to_body() {
        assert_eq!(extract_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let provider = OpenAIProvider::new(&LLMConfig::default(), None).unwrap();
        assert!(!provider.check_health().await);

        let result = provider.complete(&[Message::user("hi")]).await;
        assert!(matches!(result, Err(LLMError::AuthenticationFailed(_))));
    }

    #[test]
    fn test_provider_properties() {
        let provider =
            OpenAIProvider::new(&LLMConfig::default(), Some(SecretString::new("sk-x"))).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "gpt-3.5-turbo");
    }
}
