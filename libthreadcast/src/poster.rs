//! Sequential posting of lists and threads
//!
//! The [`Poster`] owns one authenticated platform client for the whole run
//! and publishes strictly one item at a time. There are no retries: a
//! failed item is reported and the caller decides what happens next.

use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::ScheduleSettings;
use crate::error::{PlatformError, Result, ThreadcastError};
use crate::platforms::Platform;
use crate::store::ThreadStore;
use crate::types::Thread;

/// Result of publishing a single item of a list
#[derive(Debug, Clone, Serialize)]
pub struct PostResult {
    /// 1-based position in the posts file
    pub position: usize,
    pub content: String,
    pub success: bool,
    /// Platform post id (if successful)
    pub post_id: Option<String>,
    /// Error message (if failed)
    pub error: Option<String>,
}

/// Per-item results of [`Poster::post_all`], in file order
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostReport {
    pub results: Vec<PostResult>,
}

impl PostReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// True for an empty report
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }
}

/// Check if an error is transient
///
/// Transient errors include network issues and rate limiting.
/// Permanent errors include authentication and validation failures.
pub fn is_transient_error(error: &ThreadcastError) -> bool {
    match error {
        ThreadcastError::Platform(platform_error) => match platform_error {
            PlatformError::Network(_) | PlatformError::RateLimit(_) => true,
            PlatformError::Authentication(_)
            | PlatformError::Validation(_)
            | PlatformError::Posting(_) => false,
        },
        _ => false,
    }
}

/// Publishes posts through one platform client
pub struct Poster {
    platform: Box<dyn Platform>,
    settings: ScheduleSettings,
    authenticated: bool,
}

impl Poster {
    /// Wrap an unauthenticated platform client
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use libthreadcast::config::{Config, TwitterConfig};
    /// use libthreadcast::credentials::Credentials;
    /// use libthreadcast::platforms::twitter::TwitterClient;
    /// use libthreadcast::poster::Poster;
    ///
    /// # async fn example() -> libthreadcast::error::Result<()> {
    /// let config = Config::default();
    /// let credentials = Credentials::load(&config.credentials_path())?;
    /// let client = TwitterClient::new(credentials, &config.twitter)?;
    ///
    /// let mut poster = Poster::new(Box::new(client), config.schedule.settings()?);
    /// poster.authenticate().await?;
    ///
    /// let report = poster.post_all(&["first".to_string(), "second".to_string()]).await;
    /// println!("{} posted, {} failed", report.succeeded(), report.failed());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(platform: Box<dyn Platform>, settings: ScheduleSettings) -> Self {
        Self {
            platform,
            settings,
            authenticated: false,
        }
    }

    pub fn settings(&self) -> &ScheduleSettings {
        &self.settings
    }

    /// Authenticate once; failure is fatal to the run
    pub async fn authenticate(&mut self) -> Result<()> {
        info!("Authenticating with {}", self.platform.name());
        match self.platform.authenticate().await {
            Ok(()) => {
                self.authenticated = true;
                Ok(())
            }
            Err(e) => {
                error!("Error setting up {} client: {}", self.platform.name(), e);
                Err(e)
            }
        }
    }

    /// Publish one post, returning its id
    pub async fn post_tweet(&self, content: &str, reply_to: Option<&str>) -> Result<String> {
        if !self.authenticated {
            return Err(PlatformError::Authentication(
                "Poster used before authenticate()".to_string(),
            )
            .into());
        }

        match self.platform.post(content, reply_to).await {
            Ok(id) => {
                info!("Successfully posted tweet: {}", id);
                Ok(id)
            }
            Err(e) => {
                error!("Error posting tweet: {}", e);
                Err(e)
            }
        }
    }

    /// Publish every text in order, one call each
    ///
    /// A failed item is recorded and the next item is still attempted.
    /// `post_delay` is observed between items, not after the last one.
    pub async fn post_all(&self, texts: &[String]) -> PostReport {
        let mut report = PostReport::default();

        for (index, text) in texts.iter().enumerate() {
            if index > 0 {
                self.pause(self.settings.post_delay).await;
            }

            let result = match self.post_tweet(text, None).await {
                Ok(id) => PostResult {
                    position: index + 1,
                    content: text.clone(),
                    success: true,
                    post_id: Some(id),
                    error: None,
                },
                Err(e) => PostResult {
                    position: index + 1,
                    content: text.clone(),
                    success: false,
                    post_id: None,
                    error: Some(e.to_string()),
                },
            };
            report.results.push(result);
        }

        if report.failed() > 0 {
            warn!(
                "{} of {} posts failed",
                report.failed(),
                report.results.len()
            );
        }
        report
    }

    /// Publish a thread, resolving reply targets as it goes
    ///
    /// Stops at the first failure, since later tweets may reply to the
    /// one that failed.
    pub async fn post_thread(&self, thread: &Thread) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(thread.tweets.len());
        self.resume_thread(thread, &mut ids).await?;
        Ok(ids)
    }

    /// Publish the tweets of `thread` that follow the ones already in `posted`
    ///
    /// Each new id is pushed onto `posted` as soon as the platform returns
    /// it, so after a failure `posted` holds exactly the tweets that are
    /// live and a later call picks up at the tweet that failed.
    pub async fn resume_thread(&self, thread: &Thread, posted: &mut Vec<String>) -> Result<()> {
        let start = posted.len();

        for (index, tweet) in thread.tweets.iter().enumerate().skip(start) {
            if index > start {
                self.pause(self.settings.post_delay).await;
            }

            let previous = posted.last().map(String::as_str);
            let reply_to = tweet.reply_to_id.resolve(previous);
            let id = self.post_tweet(&tweet.text, reply_to).await?;
            posted.push(id);
        }

        Ok(())
    }

    /// Publish the thread at 1-based `thread_number` right away
    ///
    /// On success the thread moves from the posts file to the archive.
    pub async fn post_specific_thread(
        &self,
        store: &mut ThreadStore,
        thread_number: usize,
    ) -> Result<Vec<String>> {
        if thread_number == 0 || thread_number > store.len() {
            let available = if store.is_empty() {
                "none".to_string()
            } else {
                format!("1-{}", store.len())
            };
            return Err(ThreadcastError::InvalidInput(format!(
                "Thread index {} is out of range. Available threads: {}",
                thread_number, available
            )));
        }

        let index = thread_number - 1;
        info!("Posting thread #{} immediately", thread_number);

        let thread = store.threads()[index].clone();
        let mut ids = Vec::with_capacity(thread.tweets.len());
        if let Err(e) = self.resume_thread(&thread, &mut ids).await {
            error!("Error posting thread #{}: {}", thread_number, e);
            if !ids.is_empty() {
                warn!(
                    "Thread #{} is partly published ({} of {} tweets): {}",
                    thread_number,
                    ids.len(),
                    thread.tweets.len(),
                    ids.join(", ")
                );
            }
            return Err(e);
        }

        store.complete(index, ids.clone())?;
        info!("Successfully posted thread #{}", thread_number);
        Ok(ids)
    }

    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            sleep(duration).await;
        }
    }
}
