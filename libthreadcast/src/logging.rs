//! Centralized logging configuration for Threadcast
//!
//! Provides consistent logging setup with support for:
//! - Text, JSON, and pretty-printed output on stderr
//! - An optional plain-text log file, written alongside stderr
//! - Level taken from `THREADCAST_LOG_LEVEL` or `RUST_LOG`
//!
//! # Examples
//!
//! ```no_run
//! use libthreadcast::logging::{LoggingConfig, LogFormat};
//!
//! let config = LoggingConfig::new(LogFormat::Json, "info".to_string(), false)
//!     .with_file("twitter_poster.log");
//! config.init().expect("log file should be writable");
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text output (no colors, for piping)
    Text,
    /// Machine-parseable JSON (one JSON object per line)
    Json,
    /// Pretty-printed with colors (for development)
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

/// Configuration for logging initialization
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    pub verbose: bool,
    /// Append a plain-text copy of every event to this file
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Create a new logging configuration
    ///
    /// # Arguments
    ///
    /// * `format` - stderr output format (text, json, or pretty)
    /// * `level` - Minimum log level (error, warn, info, debug, trace)
    /// * `verbose` - If true, defaults to debug level
    pub fn new(format: LogFormat, level: String, verbose: bool) -> Self {
        Self {
            format,
            level,
            verbose,
            file: None,
        }
    }

    /// Also write events to `path`, appending if it exists
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    fn filter(&self) -> EnvFilter {
        let fallback = if self.verbose { "debug" } else { self.level.as_str() };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    }

    /// Initialize logging with the configured settings
    ///
    /// This should be called once at the start of your program.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be opened for appending.
    ///
    /// # Panics
    ///
    /// Panics if the logging subscriber has already been initialized
    pub fn init(&self) -> std::io::Result<()> {
        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

        let stderr_layer = match self.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_span_list(true)
                .flatten_event(true)
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .boxed(),
            // Less verbose for end users
            LogFormat::Text => fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .boxed(),
        };
        layers.push(stderr_layer);

        if let Some(path) = &self.file {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            layers.push(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .boxed(),
            );
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(self.filter())
            .init();

        Ok(())
    }
}

/// Environment variable holding the default log level
pub const LOG_LEVEL_ENV_VAR: &str = "THREADCAST_LOG_LEVEL";

/// Log level from `THREADCAST_LOG_LEVEL`, or `info` when unset or blank
///
/// `RUST_LOG`, when set, still takes precedence inside [`LoggingConfig::init`].
pub fn level_from_env() -> String {
    std::env::var(LOG_LEVEL_ENV_VAR)
        .ok()
        .map(|level| level.trim().to_string())
        .filter(|level| !level.is_empty())
        .unwrap_or_else(|| "info".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);

        // Case insensitive
        assert_eq!("TEXT".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("Json".parse::<LogFormat>().unwrap(), LogFormat::Json);
    }

    #[test]
    fn test_log_format_from_str_invalid() {
        let result = "xml".parse::<LogFormat>();
        assert!(result.unwrap_err().contains("Invalid log format: 'xml'"));
    }

    #[test]
    fn test_log_format_display_round_trips_through_from_str() {
        for format in [LogFormat::Text, LogFormat::Json, LogFormat::Pretty] {
            assert_eq!(format.to_string().parse::<LogFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_logging_config_with_file() {
        let config = LoggingConfig::new(LogFormat::Text, "warn".to_string(), true)
            .with_file("twitter_poster.log");
        assert_eq!(config.level, "warn");
        assert!(config.verbose);
        assert_eq!(config.file, Some(PathBuf::from("twitter_poster.log")));
    }

    #[test]
    #[serial]
    fn test_level_from_env() {
        std::env::remove_var(LOG_LEVEL_ENV_VAR);
        assert_eq!(level_from_env(), "info");

        std::env::set_var(LOG_LEVEL_ENV_VAR, " warn ");
        assert_eq!(level_from_env(), "warn");

        std::env::set_var(LOG_LEVEL_ENV_VAR, "");
        assert_eq!(level_from_env(), "info");

        std::env::remove_var(LOG_LEVEL_ENV_VAR);
    }
}
