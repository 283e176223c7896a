//! On-disk representation of the queue: one URL per line.
//!
//! Writes go to a temporary file in the same directory which is synced and
//! renamed over the target, so readers only ever see a complete file.
//! Read-modify-write cycles are serialized across processes with an advisory
//! lock on a sidecar `<file>.lock`.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::{trace, warn};

use super::error::QueueError;

/// Reads the queue file into an ordered set. A missing file is an empty queue.
///
/// Lines that are not valid UTF-8 are skipped with a warning.
pub(crate) fn read_urls(path: &Path) -> Result<BTreeSet<String>, QueueError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(err) => return Err(QueueError::io(path, err)),
    };

    let mut urls = BTreeSet::new();
    for (index, line) in raw.split(|b| *b == b'\n').enumerate() {
        let Ok(line) = std::str::from_utf8(line) else {
            warn!(
                path = %path.display(),
                line = index + 1,
                "skipping queue line that is not valid UTF-8"
            );
            continue;
        };
        let line = line.trim();
        if !line.is_empty() {
            urls.insert(line.to_string());
        }
    }
    Ok(urls)
}

/// Atomically replaces the queue file with `urls`.
pub(crate) fn write_urls(path: &Path, urls: &BTreeSet<String>) -> Result<(), QueueError> {
    let dir = parent_dir(path);
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| QueueError::io(&dir, e))?;
    }

    let mut body = String::new();
    for url in urls {
        body.push_str(url);
        body.push('\n');
    }

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| QueueError::io(&dir, e))?;
    fill_and_sync(&mut tmp, body.as_bytes()).map_err(|e| QueueError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| QueueError::io(path, e.error))?;

    trace!(path = %path.display(), count = urls.len(), "queue file written");
    Ok(())
}

fn fill_and_sync(tmp: &mut NamedTempFile, body: &[u8]) -> io::Result<()> {
    tmp.write_all(body)?;
    tmp.flush()?;
    tmp.as_file().sync_all()
}

/// Exclusive advisory lock held for one read-modify-write cycle.
///
/// Released when dropped.
#[derive(Debug)]
pub(crate) struct QueueLock {
    file: File,
}

impl QueueLock {
    /// Blocks until the sidecar lock for `queue_file` is held.
    pub(crate) fn acquire(queue_file: &Path) -> Result<Self, QueueError> {
        let lock_path = lock_path(queue_file);
        let dir = parent_dir(&lock_path);
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| QueueError::io(&dir, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| QueueError::io(&lock_path, e))?;
        file.lock_exclusive()
            .map_err(|e| QueueError::io(&lock_path, e))?;
        Ok(Self { file })
    }
}

impl Drop for QueueLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Returns the sidecar lock path, e.g. `queue.txt` -> `queue.txt.lock`.
pub(crate) fn lock_path(queue_file: &Path) -> PathBuf {
    let mut name = queue_file
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".lock");
    queue_file.with_file_name(name)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
