//! Secret handling
//!
//! The provider credential is carried as a [`SecretString`] so it never shows
//! up in logs, and any text that may echo it back (remote error bodies in
//! particular) is passed through [`scrub`] before it reaches a page or a log
//! line.

pub mod string;

pub use string::SecretString;

use regex::Regex;
use std::sync::OnceLock;

/// Regex patterns for detecting credential formats.
/// These are compiled once and reused for performance.
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Initializes and returns the secret detection patterns.
///
/// Patterns match:
/// - OpenAI API keys: sk-[a-zA-Z0-9]{20,} (including sk-proj-, sk-test- variants)
/// - Bearer tokens: Bearer\s+[^\s]{20,}
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"sk-[a-zA-Z0-9\-_]{20,}").expect("Invalid OpenAI pattern"),
            Regex::new(r"Bearer\s+[^\s]{20,}").expect("Invalid Bearer pattern"),
        ]
    })
}

/// Scrubs secrets from text by replacing them with [REDACTED].
///
/// # Examples
/// ```
/// use ecopyright_engine::secrets::scrub;
///
/// let scrubbed = scrub("My API key is sk-1234567890abcdefghij");
/// assert_eq!(scrubbed, "My API key is [REDACTED]");
/// ```
pub fn scrub(text: &str) -> String {
    let patterns = get_secret_patterns();
    let mut result = text.to_string();

    for pattern in patterns {
        result = pattern.replace_all(&result, "[REDACTED]").to_string();
    }

    result
}

/// Scrubs the known credential verbatim, then the generic patterns.
pub fn scrub_known(text: &str, secret: &SecretString) -> String {
    let raw = secret.unsecure();
    if raw.is_empty() {
        return scrub(text);
    }
    scrub(&text.replace(raw, "[REDACTED]"))
}
