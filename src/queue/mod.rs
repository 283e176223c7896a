//! Queue module for managing the pending-URL file.
//!
//! The queue is a deduplicated set of URLs stored one per line in a plain
//! text file. Every mutation is a full read-modify-write performed under an
//! exclusive lock and persisted through an atomic rename.
//!
//! # Example
//!
//! ```ignore
//! use nasutil_core::QueueStore;
//!
//! let store = QueueStore::new("/home/me/.nasutil-to-download.txt");
//! store.insert("https://example.com/watch?v=abc&t=30")?;
//! assert_eq!(store.list()?, vec!["https://example.com/watch?v=abc"]);
//!
//! let next = store.take_one()?;
//! // ... fetch it ...
//! store.remove(&next)?;
//! ```

mod error;
mod storage;
mod url;

pub use error::QueueError;
pub use url::normalize_url;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::input::UrlSource;
use storage::{QueueLock, read_urls, write_urls};

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;

/// File-backed set of pending URLs.
#[derive(Debug, Clone)]
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    /// Creates a store over `path`. The file is not touched until the first mutation.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns all pending URLs in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Io`] if the file exists but cannot be read.
    pub fn list(&self) -> Result<Vec<String>> {
        Ok(read_urls(&self.path)?.into_iter().collect())
    }

    /// Returns the number of pending URLs.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Io`] if the file exists but cannot be read.
    pub fn len(&self) -> Result<usize> {
        Ok(read_urls(&self.path)?.len())
    }

    /// Returns true when nothing is queued.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Io`] if the file exists but cannot be read.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Adds a URL, asking `source` for one when `url` is absent or blank.
    ///
    /// Returns the normalized URL that is now queued.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NoInput`] if `source` yields nothing,
    /// [`QueueError::EmptyUrl`] if normalization leaves nothing, or
    /// [`QueueError::Io`] if persisting fails.
    #[instrument(skip(self, source))]
    pub fn add(&self, url: Option<&str>, source: &dyn UrlSource) -> Result<String> {
        let raw = match url.filter(|u| !u.trim().is_empty()) {
            Some(url) => url.to_string(),
            None => {
                debug!(source = source.name(), "no URL argument, asking input source");
                source.read_url()?.ok_or(QueueError::NoInput)?
            }
        };
        let normalized = normalize_url(&raw).ok_or(QueueError::EmptyUrl)?;
        self.insert_normalized(&normalized)?;
        Ok(normalized)
    }

    /// Normalizes and inserts `url`. Returns true when it was not already queued.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::EmptyUrl`] if normalization leaves nothing, or
    /// [`QueueError::Io`] if persisting fails.
    pub fn insert(&self, url: &str) -> Result<bool> {
        let normalized = normalize_url(url).ok_or(QueueError::EmptyUrl)?;
        self.insert_normalized(&normalized)
    }

    fn insert_normalized(&self, url: &str) -> Result<bool> {
        let _lock = QueueLock::acquire(&self.path)?;
        let mut urls = read_urls(&self.path)?;
        let added = urls.insert(url.to_string());
        write_urls(&self.path, &urls)?;
        if added {
            info!(url = %url, "queued");
        } else {
            debug!(url = %url, "already queued");
        }
        Ok(added)
    }

    /// Removes `url` from the queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NotFound`] if `url` is not queued; the file is
    /// left untouched in that case. Returns [`QueueError::Io`] if persisting fails.
    #[instrument(skip(self))]
    pub fn remove(&self, url: &str) -> Result<()> {
        let _lock = QueueLock::acquire(&self.path)?;
        let mut urls = read_urls(&self.path)?;
        if !urls.remove(url) {
            return Err(QueueError::NotFound(url.to_string()));
        }
        write_urls(&self.path, &urls)?;
        debug!(url = %url, remaining = urls.len(), "removed from queue");
        Ok(())
    }

    /// Returns one pending URL without removing it.
    ///
    /// Removal is a separate step after the URL has been processed, so a crash
    /// in between leaves it queued.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::EmptyQueue`] if nothing is queued.
    pub fn take_one(&self) -> Result<String> {
        read_urls(&self.path)?
            .into_iter()
            .next()
            .ok_or(QueueError::EmptyQueue)
    }

    /// Returns the first pending URL not contained in `skip`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::EmptyQueue`] if every queued URL is skipped.
    pub fn take_one_excluding(&self, skip: &BTreeSet<String>) -> Result<String> {
        read_urls(&self.path)?
            .into_iter()
            .find(|url| !skip.contains(url))
            .ok_or(QueueError::EmptyQueue)
    }

    /// Replaces the queue with an empty one. The file exists afterwards.
    ///
    /// Returns how many URLs were dropped. An unreadable old file counts as
    /// zero and is overwritten anyway.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Io`] if locking or persisting fails.
    #[instrument(skip(self))]
    pub fn clear(&self) -> Result<usize> {
        let _lock = QueueLock::acquire(&self.path)?;
        let dropped = match read_urls(&self.path) {
            Ok(urls) => urls.len(),
            Err(err) => {
                warn!(error = %err, "could not read old queue, clearing anyway");
                0
            }
        };
        write_urls(&self.path, &BTreeSet::new())?;
        info!(dropped, "queue cleared");
        Ok(dropped)
    }
}
