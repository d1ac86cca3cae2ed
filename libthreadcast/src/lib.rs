//! Threadcast - publish prepared posts and threads to X
//!
//! This library loads API credentials and a posts file from disk,
//! authenticates once, and publishes each entry in order.

pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod platforms;
pub mod poster;
pub mod scheduler;
pub mod scheduling;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use credentials::Credentials;
pub use error::{Result, ThreadcastError};
pub use poster::{PostReport, PostResult, Poster};
pub use scheduler::Scheduler;
pub use store::{Archive, ThreadStore};
pub use types::{PostsDocument, ReplyTarget, Thread, TweetDraft};
