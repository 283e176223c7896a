//! Explicit runtime configuration for the queue store and drain engine.
//!
//! The CLI resolves these values once (flags, environment, config file) and
//! hands a [`QueueConfig`] to [`crate::QueueStore`] and [`crate::DrainEngine`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Default upper bound for a single fetch, in seconds (6 hours).
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 21_600;

/// Default maximum silence between two output lines, in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Environment variable naming the queue file.
pub const QUEUE_FILE_ENV: &str = "NASUTIL_FILE";

/// Environment variable naming the download working directory.
pub const OUTPUT_DIR_ENV: &str = "NASUTIL_DIR";

/// Errors raised while assembling configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No queue file location was supplied.
    #[error(
        "queue file location is not configured\n  Suggestion: set {QUEUE_FILE_ENV}, pass --queue-file, or add queue_file to the config file"
    )]
    MissingQueueFile,

    /// No working directory was supplied.
    #[error(
        "download directory is not configured\n  Suggestion: set {OUTPUT_DIR_ENV}, pass --output-dir, or add output_dir to the config file"
    )]
    MissingOutputDir,

    /// A value was present but unusable.
    #[error("invalid value for `{key}`: {value} ({reason})")]
    Invalid {
        /// Setting name.
        key: &'static str,
        /// Offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// When a fetched URL counts as consumed and is removed from the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmPolicy {
    /// Remove once the destination line was seen, even if the process later fails.
    Started,
    /// Remove only when the destination line was seen and the process exited cleanly.
    #[default]
    Completed,
}

impl ConfirmPolicy {
    /// Returns the stable string label used in config files and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ConfirmPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfirmPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "started" => Ok(Self::Started),
            "completed" => Ok(Self::Completed),
            other => Err(ConfigError::Invalid {
                key: "confirm",
                value: other.to_string(),
                reason: "expected `started` or `completed`".to_string(),
            }),
        }
    }
}

/// Resolved configuration shared by the store and the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Text file holding one pending URL per line.
    pub queue_file: PathBuf,
    /// Working directory for the fetch command.
    pub output_dir: PathBuf,
    /// Overall limit for one fetch.
    pub fetch_timeout: Duration,
    /// Limit on silence between output lines.
    pub idle_timeout: Duration,
    /// Removal rule applied after each fetch.
    pub confirm: ConfirmPolicy,
}

impl QueueConfig {
    /// Creates a config with default timeouts and [`ConfirmPolicy::Completed`].
    #[must_use]
    pub fn new(queue_file: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            queue_file: queue_file.into(),
            output_dir: output_dir.into(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            confirm: ConfirmPolicy::default(),
        }
    }

    /// Builds a config from optional locations, failing on the first missing one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingQueueFile`] or [`ConfigError::MissingOutputDir`].
    pub fn from_locations(
        queue_file: Option<PathBuf>,
        output_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let queue_file = queue_file
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigError::MissingQueueFile)?;
        let output_dir = output_dir
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigError::MissingOutputDir)?;
        Ok(Self::new(queue_file, output_dir))
    }

    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_confirm(mut self, confirm: ConfirmPolicy) -> Self {
        self.confirm = confirm;
        self
    }
}

/// Expands a leading `~` component against `home`.
///
/// Paths without a leading tilde, or when `home` is unknown, are returned unchanged.
#[must_use]
pub fn expand_tilde(path: &Path, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return path.to_path_buf();
    };
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}
