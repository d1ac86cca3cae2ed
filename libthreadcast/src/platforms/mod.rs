//! Platform abstraction and implementations
//!
//! The [`Poster`](crate::poster::Poster) only talks to a platform through the
//! [`Platform`] trait. [`twitter::TwitterClient`] is the real implementation;
//! [`mock::MockPlatform`] stands in for it in tests.
//!
//! # Examples
//!
//! ```no_run
//! use libthreadcast::config::TwitterConfig;
//! use libthreadcast::credentials::Credentials;
//! use libthreadcast::platforms::{twitter::TwitterClient, Platform};
//!
//! # async fn example() -> libthreadcast::error::Result<()> {
//! let credentials = Credentials::load("credentials.json".as_ref())?;
//! let mut platform = TwitterClient::new(credentials, &TwitterConfig::default())?;
//!
//! platform.authenticate().await?;
//! let id = platform.post("Hello from threadcast", None).await?;
//! println!("Posted: {}", id);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::{PlatformError, Result};

pub mod mock;
pub mod oauth;
pub mod twitter;

/// Platform trait for social media posting
#[async_trait]
pub trait Platform: Send + Sync {
    /// Verify the credentials with the platform
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` if the platform rejects the
    /// credentials, or `PlatformError::Network` if it cannot be reached.
    async fn authenticate(&mut self) -> Result<()>;

    /// Publish `content`, optionally as a reply to another post
    ///
    /// Returns the platform-specific id of the new post.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The content fails validation (`PlatformError::Validation`)
    /// - The platform refuses the post (`PlatformError::Posting`)
    /// - Network issues occur (`PlatformError::Network`)
    async fn post(&self, content: &str, reply_to: Option<&str>) -> Result<String>;

    /// Check content against platform rules without sending it
    fn validate_content(&self, content: &str) -> Result<()>;

    /// Lowercase identifier for the platform (e.g. "twitter")
    fn name(&self) -> &str;

    /// Maximum post length in characters, if the platform has one
    fn character_limit(&self) -> Option<usize>;
}

/// Shared validation: non-empty and within `limit` characters
///
/// Length is counted in Unicode scalar values.
pub fn validate_length(platform: &str, content: &str, limit: Option<usize>) -> Result<()> {
    if content.trim().is_empty() {
        return Err(PlatformError::Validation("Content cannot be empty".to_string()).into());
    }

    if let Some(limit) = limit {
        let length = content.chars().count();
        if length > limit {
            return Err(PlatformError::Validation(format!(
                "Content exceeds {}'s {} character limit (current: {} characters)",
                platform, limit, length
            ))
            .into());
        }
    }

    Ok(())
}
