//! API credentials for the X platform
//!
//! Credentials are read once from a JSON file and held as [`SecretString`]s
//! so that they are zeroed on drop and redacted from `Debug` output. They are
//! only exposed while a request is being signed.
//!
//! # File format
//!
//! ```json
//! {
//!   "api_key": "...",
//!   "api_secret_key": "...",
//!   "access_token": "...",
//!   "access_token_secret": "..."
//! }
//! ```
//!
//! `api_key_secret` is accepted in place of `api_secret_key`, since X's
//! developer portal labels the value that way. A file holding both is
//! rejected rather than guessing which one is current.

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::{ConfigError, Result, StoreError};

/// The four OAuth 1.0a user-context secrets
#[derive(Debug)]
pub struct Credentials {
    pub api_key: SecretString,
    pub api_secret_key: SecretString,
    pub access_token: SecretString,
    pub access_token_secret: SecretString,
}

/// On-disk shape; fields are optional so a missing one can be named
#[derive(Deserialize)]
struct CredentialsFile {
    api_key: Option<String>,
    api_secret_key: Option<String>,
    api_key_secret: Option<String>,
    access_token: Option<String>,
    access_token_secret: Option<String>,
}

impl Credentials {
    pub fn new(
        api_key: impl Into<String>,
        api_secret_key: impl Into<String>,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            api_secret_key: SecretString::from(api_secret_key.into()),
            access_token: SecretString::from(access_token.into()),
            access_token_secret: SecretString::from(access_token_secret.into()),
        }
    }

    /// Load credentials from a JSON file
    ///
    /// # Errors
    ///
    /// - `StoreError::Read` if the file cannot be read
    /// - `ConfigError::InvalidValue` if it is not valid JSON
    /// - `ConfigError::MissingField` if any secret is absent or blank
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse credentials from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        Self::parse(content, "credentials")
    }

    fn parse(content: &str, source: &str) -> Result<Self> {
        let file: CredentialsFile =
            serde_json::from_str(content).map_err(|e| ConfigError::InvalidValue {
                field: source.to_string(),
                reason: e.to_string(),
            })?;

        let api_secret_key = match (file.api_secret_key, file.api_key_secret) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidValue {
                    field: source.to_string(),
                    reason: "both api_secret_key and api_key_secret are set; keep one".to_string(),
                }
                .into())
            }
            (secret, alias) => secret.or(alias),
        };

        Ok(Self {
            api_key: required("api_key", file.api_key)?,
            api_secret_key: required("api_secret_key", api_secret_key)?,
            access_token: required("access_token", file.access_token)?,
            access_token_secret: required("access_token_secret", file.access_token_secret)?,
        })
    }

    pub fn consumer_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    pub fn consumer_secret(&self) -> &str {
        self.api_secret_key.expose_secret()
    }

    pub fn token(&self) -> &str {
        self.access_token.expose_secret()
    }

    pub fn token_secret(&self) -> &str {
        self.access_token_secret.expose_secret()
    }
}

fn required(field: &str, value: Option<String>) -> Result<SecretString> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(SecretString::from(value.trim().to_string())),
        _ => Err(ConfigError::MissingField(field.to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const VALID: &str = r#"{
        "api_key": "ck",
        "api_secret_key": "cs",
        "access_token": "at",
        "access_token_secret": "ats"
    }"#;

    #[test]
    fn test_load_valid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");
        fs::write(&path, VALID).unwrap();

        let creds = Credentials::load(&path).unwrap();
        assert_eq!(creds.consumer_key(), "ck");
        assert_eq!(creds.consumer_secret(), "cs");
        assert_eq!(creds.token(), "at");
        assert_eq!(creds.token_secret(), "ats");
    }

    #[test]
    fn test_api_key_secret_alias() {
        let creds = Credentials::from_json(
            r#"{"api_key":"ck","api_key_secret":"cs","access_token":"at","access_token_secret":"ats"}"#,
        )
        .unwrap();
        assert_eq!(creds.consumer_secret(), "cs");
    }

    #[test]
    fn test_both_secret_key_spellings_conflict() {
        let err = Credentials::from_json(
            r#"{"api_key":"ck","api_secret_key":"cs","api_key_secret":"old","access_token":"at","access_token_secret":"ats"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("both api_secret_key and api_key_secret"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_missing_field_is_named() {
        let err = Credentials::from_json(r#"{"api_key":"ck","api_secret_key":"cs","access_token":"at"}"#)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required field: access_token_secret"
        );
    }

    #[test]
    fn test_blank_field_counts_as_missing() {
        let err = Credentials::from_json(
            r#"{"api_key":"  ","api_secret_key":"cs","access_token":"at","access_token_secret":"ats"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn test_malformed_json_names_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");
        fs::write(&path, "{\"api_key\": ").unwrap();

        let err = Credentials::load(&path).unwrap_err();
        assert!(err.to_string().contains("credentials.json"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Credentials::load(Path::new("/nonexistent/credentials.json")).unwrap_err();
        assert!(matches!(
            err,
            crate::ThreadcastError::Store(StoreError::Read { .. })
        ));
        assert!(err.to_string().contains("/nonexistent/credentials.json"));
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let creds = Credentials::new("visible-key", "visible-secret", "tok", "tok-secret");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("visible-key"));
        assert!(!debug.contains("visible-secret"));
        assert!(!debug.contains("tok-secret"));
    }
}
