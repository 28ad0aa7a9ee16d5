//! Error types and handling
//!
//! This module provides the error types used throughout the E-Copyright engine.
//! All errors implement the `ErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages never carry the provider credential. Remote error bodies are
//! passed through the engine's secret scrubber before they reach a page.

use thiserror::Error;

/// Trait for engine error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait ErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display in the browser and does not contain
    /// secrets, file paths or internal implementation details.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors leave the session usable: the user can simply submit
    /// again. Non-recoverable errors need an operator to fix configuration.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: invalid settings, missing or invalid credential
/// - **Conversation**: failures of the remote completion call
/// - **Input**: rejected user submissions
/// - **Subscription**: invalid ledger requests
/// - **Session**: unknown or discarded session contexts
/// - **Presentation**: page templates that failed to render
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ErrorExt};
///
/// let error = EngineError::InputRejected("message is empty".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::MissingCredential("config.json".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API key is missing: {0}")]
    MissingCredential(String),

    #[error("API key is invalid: {0}")]
    InvalidCredential(String),

    // Conversation errors
    #[error("Authentication with the completion provider failed: {0}")]
    Authentication(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Completion request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Completion provider returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    // Input errors
    #[error("Input rejected: {0}")]
    InputRejected(String),

    // Subscription errors
    #[error("Invalid extension of {0} days")]
    InvalidExtension(i64),

    #[error("Ledger error: {0}")]
    Ledger(String),

    // Session errors
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Presentation errors
    #[error("Render error: {0}")]
    Render(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Whether the error came from the remote completion call
    pub fn is_conversation_error(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_)
                | Self::Transport(_)
                | Self::Timeout(_)
                | Self::Remote { .. }
                | Self::MalformedResponse(_)
        )
    }
}

impl ErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            // Configuration errors
            Self::Config(_) => "Check your config.toml file for errors",
            Self::MissingCredential(_) | Self::InvalidCredential(_) => {
                "API key is missing or incorrect. Please provide a valid API key in the config.json file"
            }

            // Conversation errors
            Self::Authentication(_) => "The completion provider rejected the API key",
            Self::Transport(_) => "Could not reach the completion provider. Check your network",
            Self::Timeout(_) => "The completion provider took too long to respond. Try again",
            Self::Remote { .. } => "The completion provider returned an error. Try again later",
            Self::MalformedResponse(_) => "The completion provider sent an unreadable reply",

            // Input errors
            Self::InputRejected(_) => "Please enter a non-empty message within the character limit",

            // Subscription errors
            Self::InvalidExtension(_) => "Extension period must be a positive number of days",
            Self::Ledger(_) => "Subscription records are unavailable. Try again",

            // Session errors
            Self::SessionNotFound(_) => "Your session has ended. Reload the page to start a new one",

            // Network errors
            Self::Network(_) => "Network operation failed. Check your connection",

            // Presentation errors
            Self::Render(_) => "The page could not be displayed. Try again",

            // Generic IO error
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Config(_)
            | Self::MissingCredential(_)
            | Self::InvalidCredential(_)
            | Self::Authentication(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}
