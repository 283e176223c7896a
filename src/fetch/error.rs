//! Error types for the fetch command.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Why a fetch did not confirm the URL as consumed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The command could not be started at all.
    #[error(
        "failed to start `{program}`: {source}\n  Suggestion: Check that yt-dlp is installed and on PATH"
    )]
    Spawn {
        /// Program that failed to spawn.
        program: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The command finished without ever announcing a destination file.
    #[error("no destination announced for {url} (exit status {})", display_code(.exit_code))]
    NoDestination {
        /// The URL that was fetched.
        url: String,
        /// Exit code, if the process exited normally.
        exit_code: Option<i32>,
    },

    /// The command announced a destination but then exited unsuccessfully.
    #[error("fetch of {url} failed with exit status {}", display_code(.exit_code))]
    ExitFailure {
        /// The URL that was fetched.
        url: String,
        /// Exit code, if the process exited normally.
        exit_code: Option<i32>,
        /// File the command had started writing.
        destination: Option<PathBuf>,
    },

    /// The command ran too long, or went silent too long, and was killed.
    #[error("fetch of {url} timed out after {}s ({kind})", .after.as_secs())]
    TimedOut {
        /// The URL that was fetched.
        url: String,
        /// The limit that was exceeded.
        after: Duration,
        /// Which limit: `idle` or `overall`.
        kind: &'static str,
    },

    /// Reading the command's output or waiting for it failed.
    #[error("IO error while fetching {url}: {source}")]
    Io {
        /// The URL that was fetched.
        url: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

#[allow(clippy::ref_option)]
fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

impl FetchError {
    /// Returns the exit code carried by the error, if any.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NoDestination { exit_code, .. } | Self::ExitFailure { exit_code, .. } => {
                *exit_code
            }
            Self::Spawn { .. } | Self::TimedOut { .. } | Self::Io { .. } => None,
        }
    }
}
