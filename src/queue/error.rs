//! Error types for queue operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::input::InputError;

/// Errors that can occur during queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue has no pending URLs.
    #[error("queue is empty")]
    EmptyQueue,

    /// The URL to remove is not queued.
    #[error(
        "URL not in queue: {0}\n  Suggestion: Run `nasutil list` to see the exact queued URLs"
    )]
    NotFound(String),

    /// Normalization left nothing to store.
    #[error("refusing to queue an empty URL")]
    EmptyUrl,

    /// No URL was given and the input source produced none.
    #[error(
        "no URL supplied\n  Suggestion: Pass the URL as an argument or copy it to the clipboard"
    )]
    NoInput,

    /// The input source failed while asking for a URL.
    #[error(transparent)]
    Input(#[from] InputError),

    /// Reading, writing or locking the queue file failed.
    #[error("IO error on queue file {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl QueueError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for the idle condition a drain treats as "nothing to do".
    #[must_use]
    pub fn is_empty_queue(&self) -> bool {
        matches!(self, Self::EmptyQueue)
    }
}
