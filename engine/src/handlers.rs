//! Command handlers for CLI operations
//!
//! - serve: run the web front-end until Ctrl-C
//! - doctor: report configuration and credential status

use anyhow::{Context, Result};
use sdk::errors::{EngineError, ErrorExt};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::{load_api_key, Config};
use crate::conversation::ConversationChain;
use crate::llm::openai::OpenAIProvider;
use crate::llm::CompletionProvider;
use crate::session::SessionStore;
use crate::subscription::SubscriptionLedger;
use crate::web::{AppState, ChatService, WebServer};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Build the chat service from the credential file
///
/// A credential problem does not stop the server: chat is disabled and the
/// error is shown on the chat view while the other views keep working.
pub fn build_chat_service(config: &Config) -> ChatService {
    let api_key = match load_api_key(&config.llm.credentials_file) {
        Ok(key) => key,
        Err(e) => {
            error!("Chat disabled: {}", e);
            return ChatService::Disabled(format!("{}.", e.user_hint()));
        }
    };

    match OpenAIProvider::new(&config.llm, Some(api_key)) {
        Ok(provider) => {
            info!(
                "Chat enabled via {} (model {})",
                config.llm.base_url, config.llm.model
            );
            let chain = ConversationChain::from_config(Arc::new(provider), config);
            ChatService::Enabled(Arc::new(chain))
        }
        Err(e) => {
            let e = EngineError::from(e);
            error!("Chat disabled: {}", e);
            ChatService::Disabled(e.to_string())
        }
    }
}

/// Assemble the shared state for the web front-end
pub fn build_app_state(config: &Config) -> Result<AppState, EngineError> {
    let chat = build_chat_service(config);
    let ledger = Arc::new(SubscriptionLedger::in_memory(
        config.subscription.renewal_policy,
    ));
    let sessions = Arc::new(SessionStore::with_idle_minutes(config.session.idle_minutes));

    AppState::new(config, chat, ledger, sessions)
}

/// Serve the web front-end until Ctrl-C
pub async fn handle_serve(config: &Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let state = build_app_state(config)?;
    if !state.chat.is_enabled() {
        warn!("Serving with chat disabled; about, login and subscription remain available");
    }

    let server = WebServer::start(&host, port, state).await?;
    println!("E-Copyright is running at http://{}", server.local_addr());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    server.stop().await;
    Ok(())
}

/// Validate configuration and check the credential
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(&str, String)> = Vec::new();

    // Config is already validated when loaded
    checks.push(("Configuration", "Valid".to_string()));
    checks.push((
        "Listen address",
        format!("{}:{}", config.server.host, config.server.port),
    ));
    checks.push(("Model", config.llm.model.clone()));
    checks.push(("Endpoint", config.llm.base_url.clone()));
    checks.push((
        "History window",
        format!("{} exchanges", config.conversation.history_exchanges),
    ));
    checks.push((
        "Renewal policy",
        format!("{:?}", config.subscription.renewal_policy),
    ));

    let credentials = config.llm.credentials_file.display().to_string();
    match load_api_key(&config.llm.credentials_file) {
        Ok(key) => {
            let provider =
                OpenAIProvider::new(&config.llm, Some(key)).map_err(EngineError::from)?;
            if provider.check_health().await {
                checks.push(("API key", "Configured".to_string()));
            } else {
                checks.push(("API key", "Empty".to_string()));
                issues.push(format!("API key in {} is empty", credentials));
            }
        }
        Err(e) => {
            checks.push(("API key", "Not configured".to_string()));
            issues.push(format!("{} ({}: {})", e.user_hint(), credentials, e));
        }
    }

    match format {
        OutputFormat::Text => {
            println!("E-Copyright Diagnostics");
            println!("=======================");
            println!();

            println!("Checks:");
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_with_credentials(path: std::path::PathBuf) -> Config {
        let mut config = Config::default();
        config.llm.credentials_file = path;
        config
    }

    #[test]
    fn test_missing_credential_disables_chat() {
        let dir = TempDir::new().unwrap();
        let config = config_with_credentials(dir.path().join("config.json"));

        // OPENAI_API_KEY in the test environment would enable chat
        if std::env::var(crate::config::credentials::API_KEY_ENV).is_ok() {
            return;
        }

        match build_chat_service(&config) {
            ChatService::Disabled(message) => {
                assert!(message.contains("API key is missing or incorrect"));
            }
            ChatService::Enabled(_) => panic!("chat should be disabled"),
        }
    }

    #[test]
    fn test_credential_file_enables_chat() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"openai_api_key": "sk-test"}"#).unwrap();

        let state = build_app_state(&config_with_credentials(path)).unwrap();
        assert!(state.chat.is_enabled());
    }

    #[tokio::test]
    async fn test_doctor_reports_without_failing() {
        let dir = TempDir::new().unwrap();
        let config = config_with_credentials(dir.path().join("missing.json"));
        assert!(handle_doctor(&config, OutputFormat::Json).await.is_ok());
    }
}
