//! Provider credential loading
//!
//! The completion provider key is read from a small JSON file:
//!
//! ```json
//! { "openai_api_key": "sk-..." }
//! ```
//!
//! When the `OPENAI_API_KEY` environment variable is set and non-empty it
//! takes precedence over the file. A missing file, unreadable JSON, or an
//! absent or blank key is a configuration error: the web front-end keeps
//! running but the chat view is disabled.

use sdk::errors::EngineError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::secrets::SecretString;

/// Environment variable that overrides the credential file
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// On-disk shape of the credential file
#[derive(Debug, Deserialize)]
pub struct CredentialFile {
    #[serde(default)]
    pub openai_api_key: Option<String>,
}

/// Resolve the provider API key from the environment or the credential file
pub fn load_api_key(path: &Path) -> Result<SecretString, EngineError> {
    resolve_api_key(path, std::env::var(API_KEY_ENV).ok())
}

/// Resolve the key, preferring `env_value` when it is non-empty
pub fn resolve_api_key(
    path: &Path,
    env_value: Option<String>,
) -> Result<SecretString, EngineError> {
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        tracing::debug!("Using API key from {}", API_KEY_ENV);
        return Ok(SecretString::new(value.trim()));
    }

    read_credential_file(path)
}

/// Read the key from a JSON credential file
pub fn read_credential_file(path: &Path) -> Result<SecretString, EngineError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        EngineError::MissingCredential(format!("cannot read {}: {}", path.display(), e))
    })?;

    let file: CredentialFile = serde_json::from_str(&contents).map_err(|e| {
        EngineError::InvalidCredential(format!("{} is not valid JSON: {}", path.display(), e))
    })?;

    match file.openai_api_key {
        Some(key) if !key.trim().is_empty() => {
            tracing::debug!("Loaded API key from {}", path.display());
            Ok(SecretString::new(key.trim()))
        }
        Some(_) => Err(EngineError::InvalidCredential(format!(
            "openai_api_key in {} is empty",
            path.display()
        ))),
        None => Err(EngineError::MissingCredential(format!(
            "openai_api_key not present in {}",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn credential_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_reads_key_from_file() {
        let file = credential_file(r#"{"openai_api_key": "sk-test-123"}"#);
        let key = read_credential_file(file.path()).unwrap();
        assert_eq!(key.unsecure(), "sk-test-123");
    }

    #[test]
    fn test_missing_file_is_missing_credential() {
        let result = read_credential_file(Path::new("/nonexistent/ecopyright/config.json"));
        assert!(matches!(result, Err(EngineError::MissingCredential(_))));
    }

    #[test]
    fn test_missing_key_is_missing_credential() {
        let file = credential_file(r#"{"other": "value"}"#);
        let result = read_credential_file(file.path());
        assert!(matches!(result, Err(EngineError::MissingCredential(_))));
    }

    #[test]
    fn test_blank_key_is_invalid() {
        let file = credential_file(r#"{"openai_api_key": "   "}"#);
        let result = read_credential_file(file.path());
        assert!(matches!(result, Err(EngineError::InvalidCredential(_))));
    }

    #[test]
    fn test_malformed_json_is_invalid() {
        let file = credential_file("openai_api_key = sk-123");
        let result = read_credential_file(file.path());
        assert!(matches!(result, Err(EngineError::InvalidCredential(_))));
    }

    #[test]
    fn test_environment_value_wins() {
        let result = resolve_api_key(
            Path::new("/nonexistent/config.json"),
            Some("sk-from-env".to_string()),
        )
        .unwrap();
        assert_eq!(result.unsecure(), "sk-from-env");
    }

    #[test]
    fn test_blank_environment_value_falls_back_to_file() {
        let file = credential_file(r#"{"openai_api_key": "sk-file"}"#);
        let result = resolve_api_key(file.path(), Some(String::new())).unwrap();
        assert_eq!(result.unsecure(), "sk-file");
    }
}
