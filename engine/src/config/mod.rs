//! Configuration management
//!
//! This module handles loading, validation, and management of the E-Copyright
//! configuration. Configuration is stored in TOML format at
//! ~/.ecopyright/config.toml. The provider credential lives in a separate JSON
//! file (see [`credentials`]).
//!
//! # Configuration Sections
//!
//! - **core**: log level
//! - **server**: listen address of the web front-end
//! - **llm**: completion provider settings and credential file location
//! - **conversation**: system instruction, history window, input limit
//! - **subscription**: extension period, price label, renewal policy
//! - **session**: idle timeout for browser sessions
//!
//! # Examples
//!
//! ```no_run
//! use ecopyright_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Listening on {}:{}", config.server.host, config.server.port);
//! println!("Model: {}", config.llm.model);
//! # Ok(())
//! # }
//! ```

pub mod credentials;

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::subscription::RenewalPolicy;

pub use credentials::{load_api_key, CredentialFile};

/// System instruction sent ahead of every prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = "Answer the question as truthfully as possible using the provided context, \
and if the answer is not contained within the text below, say 'I don't know'";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Web server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Completion provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Conversation window configuration
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Subscription ledger configuration
    #[serde(default)]
    pub subscription: SubscriptionConfig,

    /// Browser session configuration
    #[serde(default)]
    pub session: SessionConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind (0 picks a free port)
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// JSON file holding `openai_api_key` (supports ~ expansion)
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,

    /// Base URL for the OpenAI-compatible API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Target model identifier
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Upper bound for one completion request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Conversation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Instruction placed first in every prompt
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Number of past user/assistant exchanges included in the prompt
    #[serde(default = "default_history_exchanges")]
    pub history_exchanges: usize,

    /// Maximum characters accepted in one chat submission
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

/// Subscription configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Days granted by one extension
    #[serde(default = "default_extension_days")]
    pub extension_days: i64,

    /// Price shown on the extension button
    #[serde(default = "default_price_label")]
    pub price_label: String,

    /// Base used when renewing a known user
    #[serde(default)]
    pub renewal_policy: RenewalPolicy,
}

/// Browser session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sessions idle longer than this are discarded
    #[serde(default = "default_idle_minutes")]
    pub idle_minutes: i64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8501
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("config.json")
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_history_exchanges() -> usize {
    5
}

fn default_max_input_chars() -> usize {
    200
}

fn default_extension_days() -> i64 {
    30
}

fn default_price_label() -> String {
    "$10".to_string()
}

fn default_idle_minutes() -> i64 {
    60
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            credentials_file: default_credentials_file(),
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            history_exchanges: default_history_exchanges(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            extension_days: default_extension_days(),
            price_label: default_price_label(),
            renewal_policy: RenewalPolicy::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_minutes: default_idle_minutes(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl ConversationConfig {
    /// Number of turns passed to the prompt window (two per exchange)
    pub fn window_turns(&self) -> usize {
        self.history_exchanges.saturating_mul(2)
    }
}

impl Config {
    /// Load configuration from the default location (~/.ecopyright/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written, TOML parsing
    /// fails, or validation fails.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default_config();
        config.validate_and_process()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Wrote default configuration to {}", path.display());
        Ok(config)
    }

    /// Get the default configuration file path (~/.ecopyright/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".ecopyright").join("config.toml"))
    }

    /// Create a default configuration
    fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            server: ServerConfig::default(),
            llm: LLMConfig::default(),
            conversation: ConversationConfig::default(),
            subscription: SubscriptionConfig::default(),
            session: SessionConfig::default(),
        }
    }

    /// Validate and process configuration
    ///
    /// Checks value ranges and expands ~ in the credential file path.
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.server.host.trim().is_empty() {
            return Err(EngineError::Config("server.host must not be empty".to_string()));
        }

        if !(self.llm.base_url.starts_with("http://") || self.llm.base_url.starts_with("https://"))
        {
            return Err(EngineError::Config(format!(
                "llm.base_url must be an http(s) URL, got '{}'",
                self.llm.base_url
            )));
        }
        self.llm.base_url = self.llm.base_url.trim_end_matches('/').to_string();

        if self.llm.model.trim().is_empty() {
            return Err(EngineError::Config("llm.model must not be empty".to_string()));
        }

        if self.llm.request_timeout_secs == 0 {
            return Err(EngineError::Config(
                "llm.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.conversation.max_input_chars == 0 {
            return Err(EngineError::Config(
                "conversation.max_input_chars must be greater than 0".to_string(),
            ));
        }

        if self.subscription.extension_days <= 0 {
            return Err(EngineError::Config(
                "subscription.extension_days must be greater than 0".to_string(),
            ));
        }

        if self.session.idle_minutes <= 0 {
            return Err(EngineError::Config(
                "session.idle_minutes must be greater than 0".to_string(),
            ));
        }

        self.llm.credentials_file = expand_path(&self.llm.credentials_file)?;

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
///
/// # Examples
///
/// ```ignore
/// let path = PathBuf::from("~/secrets/config.json");
/// let expanded = expand_path(&path)?;
/// // expanded is now /home/user/secrets/config.json (on Unix)
/// ```
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.conversation.history_exchanges, 5);
        assert_eq!(config.conversation.max_input_chars, 200);
        assert_eq!(config.subscription.extension_days, 30);
        assert_eq!(config.subscription.renewal_policy, RenewalPolicy::Rebase);
        assert_eq!(config.llm.credentials_file, PathBuf::from("config.json"));
    }

    #[test]
    fn test_window_turns_counts_both_sides() {
        let config = ConversationConfig::default();
        assert_eq!(config.window_turns(), 10);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.server.port, 8501);
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert!(config.conversation.system_prompt.contains("I don't know"));
    }

    #[test]
    fn test_trailing_slash_is_trimmed_from_base_url() {
        let config = Config::from_toml_str(
            r#"
[llm]
base_url = "http://localhost:9000/v1/"
"#,
        )
        .unwrap();
        assert_eq!(config.llm.base_url, "http://localhost:9000/v1");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cases = [
            "[core]\nlog_level = \"loud\"",
            "[llm]\nbase_url = \"ftp://example.com\"",
            "[llm]\nmodel = \"\"",
            "[llm]\nrequest_timeout_secs = 0",
            "[conversation]\nmax_input_chars = 0",
            "[subscription]\nextension_days = 0",
            "[session]\nidle_minutes = -5",
        ];

        for case in cases {
            let result = Config::from_toml_str(case);
            assert!(
                matches!(result, Err(EngineError::Config(_))),
                "expected config error for {case:?}"
            );
        }
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(
            config.subscription.renewal_policy,
            deserialized.subscription.renewal_policy
        );
    }
}
