//! Mock platform implementation for testing
//!
//! A configurable stand-in for the real client. Call counts and published
//! content live behind `Arc`s in [`MockConfig`], so a test can keep a clone
//! of the config and inspect it after handing the platform to a
//! [`Poster`](crate::poster::Poster). Ids are sequential (`<name>-1`,
//! `<name>-2`, ...) so reply chains are predictable.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::{PlatformError, Result};
use crate::platforms::{validate_length, Platform};

/// A post the mock accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPost {
    pub id: String,
    pub content: String,
    pub reply_to: Option<String>,
}

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Platform name, also the id prefix
    pub name: String,

    /// Whether authentication should succeed
    pub auth_succeeds: bool,

    /// Error to return on authentication failure
    pub auth_error: Option<String>,

    /// 1-based post call numbers that fail
    pub failing_calls: HashSet<usize>,

    /// Error to return on posting failure
    pub post_error: PlatformError,

    /// Character limit for validation
    pub character_limit: Option<usize>,

    /// Number of times authenticate has been called
    pub auth_call_count: Arc<Mutex<usize>>,

    /// Every text passed to post, accepted or not, in call order
    pub attempted: Arc<Mutex<Vec<String>>>,

    /// Posts that succeeded
    pub posted: Arc<Mutex<Vec<MockPost>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            auth_succeeds: true,
            auth_error: None,
            failing_calls: HashSet::new(),
            post_error: PlatformError::Posting("Mock posting failed".to_string()),
            character_limit: None,
            auth_call_count: Arc::new(Mutex::new(0)),
            attempted: Arc::new(Mutex::new(Vec::new())),
            posted: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockConfig {
    /// Get the number of times authenticate was called
    pub fn auth_call_count(&self) -> usize {
        *self.auth_call_count.lock().unwrap()
    }

    /// Get the number of times post was called
    pub fn post_call_count(&self) -> usize {
        self.attempted.lock().unwrap().len()
    }

    /// Texts passed to post, in call order
    pub fn attempted(&self) -> Vec<String> {
        self.attempted.lock().unwrap().clone()
    }

    /// Posts that were accepted
    pub fn posted(&self) -> Vec<MockPost> {
        self.posted.lock().unwrap().clone()
    }
}

/// Mock platform for testing
pub struct MockPlatform {
    config: MockConfig,
    authenticated: bool,
}

impl MockPlatform {
    /// Create a new mock platform with the given configuration
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            authenticated: false,
        }
    }

    /// Create a mock platform that always succeeds
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Create a mock platform that fails authentication
    pub fn auth_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            auth_succeeds: false,
            auth_error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Create a mock platform whose listed post calls (1-based) fail
    pub fn failing_calls(name: &str, calls: &[usize], error: PlatformError) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            failing_calls: calls.iter().copied().collect(),
            post_error: error,
            ..Default::default()
        })
    }

    /// Create a mock platform with a character limit
    pub fn with_limit(name: &str, limit: usize) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            character_limit: Some(limit),
            ..Default::default()
        })
    }

    /// A handle sharing this platform's counters
    pub fn config(&self) -> MockConfig {
        self.config.clone()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn authenticate(&mut self) -> Result<()> {
        *self.config.auth_call_count.lock().unwrap() += 1;

        if self.config.auth_succeeds {
            self.authenticated = true;
            Ok(())
        } else {
            let error_msg = self
                .config
                .auth_error
                .clone()
                .unwrap_or_else(|| "Mock authentication failed".to_string());
            Err(PlatformError::Authentication(error_msg).into())
        }
    }

    async fn post(&self, content: &str, reply_to: Option<&str>) -> Result<String> {
        let call = {
            let mut attempted = self.config.attempted.lock().unwrap();
            attempted.push(content.to_string());
            attempted.len()
        };

        if !self.authenticated {
            return Err(PlatformError::Authentication("Not authenticated".to_string()).into());
        }

        self.validate_content(content)?;

        if self.config.failing_calls.contains(&call) {
            return Err(self.config.post_error.clone().into());
        }

        let id = format!("{}-{}", self.config.name, call);
        self.config.posted.lock().unwrap().push(MockPost {
            id: id.clone(),
            content: content.to_string(),
            reply_to: reply_to.map(str::to_string),
        });
        Ok(id)
    }

    fn validate_content(&self, content: &str) -> Result<()> {
        validate_length(self.name(), content, self.config.character_limit)
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn character_limit(&self) -> Option<usize> {
        self.config.character_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let mut platform = MockPlatform::success("test");
        let handle = platform.config();

        assert_eq!(platform.name(), "test");
        assert_eq!(platform.character_limit(), None);

        platform.authenticate().await.unwrap();
        assert_eq!(handle.auth_call_count(), 1);

        let first = platform.post("Test content", None).await.unwrap();
        let second = platform.post("Reply", Some(&first)).await.unwrap();
        assert_eq!(first, "test-1");
        assert_eq!(second, "test-2");

        let posted = handle.posted();
        assert_eq!(posted.len(), 2);
        assert_eq!(posted[1].reply_to.as_deref(), Some("test-1"));
    }

    #[tokio::test]
    async fn test_mock_auth_failure() {
        let mut platform = MockPlatform::auth_failure("test", "Invalid credentials");

        let err = platform.authenticate().await.unwrap_err();
        assert!(err.to_string().contains("Invalid credentials"));
        assert_eq!(platform.config().auth_call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_failing_calls() {
        let mut platform = MockPlatform::failing_calls(
            "test",
            &[2],
            PlatformError::Network("Connection reset".to_string()),
        );
        platform.authenticate().await.unwrap();

        assert!(platform.post("one", None).await.is_ok());
        let err = platform.post("two", None).await.unwrap_err();
        assert!(err.to_string().contains("Connection reset"));
        assert!(platform.post("three", None).await.is_ok());

        let handle = platform.config();
        assert_eq!(handle.post_call_count(), 3);
        assert_eq!(handle.posted().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_with_character_limit() {
        let platform = MockPlatform::with_limit("test", 10);

        assert_eq!(platform.character_limit(), Some(10));
        assert!(platform.validate_content("Short").is_ok());

        let result = platform.validate_content("This is way too long");
        assert!(result.unwrap_err().to_string().contains("character limit"));
    }

    #[tokio::test]
    async fn test_mock_requires_authentication() {
        let platform = MockPlatform::success("test");

        let result = platform.post("Test", None).await;
        assert!(result.unwrap_err().to_string().contains("Not authenticated"));
    }
}
