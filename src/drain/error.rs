//! Error types for the drain engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::queue::QueueError;

/// Failures that stop a drain. Fetch failures are not among them; they are
/// reported per URL in [`super::DrainReport`].
#[derive(Debug, Error)]
pub enum DrainError {
    /// The queue file could not be read or updated.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The download directory could not be created.
    #[error("download directory {path} is unusable: {source}")]
    Workdir {
        /// The configured working directory.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
