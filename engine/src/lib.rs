//! E-Copyright Engine Library
//!
//! Core functionality of the E-Copyright assistant: configuration, the
//! subscription ledger, conversation memory and chain, the completion client
//! and the web front-end. Used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret handling module
pub mod secrets;

/// Time source module
pub mod clock;

/// Subscription ledger module
pub mod subscription;

/// Conversation memory and chain module
pub mod conversation;

/// Completion provider abstraction layer
pub mod llm;

/// Browser session module
pub mod session;

/// Web front-end module
pub mod web;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
