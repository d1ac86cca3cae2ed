//! Configuration management for Threadcast
//!
//! Every setting has a default, so the configuration file is optional. With
//! no file the tool reads `credentials.json` and `posts.json` from the
//! working directory, exactly like running it bare.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Name of the configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "threadcast.toml";

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV_VAR: &str = "THREADCAST_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub files: FilesConfig,
    pub twitter: TwitterConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub credentials: String,
    pub posts: String,
    pub archive: String,
    /// Plain-text log file written alongside stderr; unset disables it
    pub log: Option<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            credentials: "credentials.json".to_string(),
            posts: "posts.json".to_string(),
            archive: "archived.json".to_string(),
            log: Some("twitter_poster.log".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    pub api_base: String,
    pub character_limit: usize,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitter.com".to_string(),
            character_limit: 280,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// IANA zone that `scheduled_time` values are written in
    pub timezone: String,
    /// Pause after each tweet of a thread
    pub post_delay: String,
    /// Pause between scheduler ticks
    pub poll_interval: String,
    /// Pause after a failed scheduler tick
    pub error_backoff: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: "America/Sao_Paulo".to_string(),
            post_delay: "2s".to_string(),
            poll_interval: "30s".to_string(),
            error_backoff: "60s".to_string(),
        }
    }
}

/// Parsed form of [`ScheduleConfig`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleSettings {
    pub timezone: Tz,
    pub post_delay: Duration,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
}

impl ScheduleSettings {
    /// Settings with no pauses, for driving the poster in tests
    pub fn immediate(timezone: Tz) -> Self {
        Self {
            timezone,
            post_delay: Duration::ZERO,
            poll_interval: Duration::ZERO,
            error_backoff: Duration::ZERO,
        }
    }
}

impl ScheduleConfig {
    /// Parse the timezone and durations
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad field.
    pub fn settings(&self) -> Result<ScheduleSettings> {
        let timezone = self
            .timezone
            .parse::<Tz>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "schedule.timezone".to_string(),
                reason: e.to_string(),
            })?;

        Ok(ScheduleSettings {
            timezone,
            post_delay: parse_duration("schedule.post_delay", &self.post_delay)?,
            poll_interval: parse_duration("schedule.poll_interval", &self.poll_interval)?,
            error_backoff: parse_duration("schedule.error_backoff", &self.error_backoff)?,
        })
    }
}

fn parse_duration(field: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value).map_err(|e| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("'{}': {}", value, e),
        }
        .into()
    })
}

impl Config {
    /// Load configuration, falling back to defaults when no file exists
    ///
    /// An `explicit` path (from the command line) must exist. Otherwise
    /// `THREADCAST_CONFIG` is consulted, then `threadcast.toml` in the
    /// working directory.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match resolve_config_path(explicit) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        self.schedule.settings()?;

        if self.twitter.character_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "twitter.character_limit".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }

        if self.files.credentials.trim().is_empty() {
            return Err(ConfigError::MissingField("files.credentials".to_string()).into());
        }
        if self.files.posts.trim().is_empty() {
            return Err(ConfigError::MissingField("files.posts".to_string()).into());
        }

        Ok(())
    }

    pub fn credentials_path(&self) -> PathBuf {
        expand_path(&self.files.credentials)
    }

    pub fn posts_path(&self) -> PathBuf {
        expand_path(&self.files.posts)
    }

    pub fn archive_path(&self) -> PathBuf {
        expand_path(&self.files.archive)
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.files.log.as_deref().map(expand_path)
    }
}

/// Resolve which configuration file to read, if any
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_path(&path.to_string_lossy()));
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(expand_path(&path));
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.exists().then_some(local)
}

/// Expand `~` and environment variables in a configured path
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}
