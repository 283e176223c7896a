//! Queue maintenance commands: list, add, remove, empty, version.

use std::io::Write;

use anyhow::{Context, Result};
use nasutil_core::{FallbackSource, QueueStore, UrlSource};
use tracing::{debug, info};

/// Prints every queued URL, one per line, to `out`.
pub(crate) fn run_list_command(store: &QueueStore, out: &mut impl Write) -> Result<()> {
    let urls = store.list()?;
    if urls.is_empty() {
        info!(queue = %store.path().display(), "Queue is empty");
        return Ok(());
    }
    for url in &urls {
        writeln!(out, "{url}").context("Failed to write queue listing")?;
    }
    Ok(())
}

/// Queues `url`, or a URL read from the clipboard or a prompt when it is absent.
pub(crate) fn run_add_command(store: &QueueStore, url: Option<&str>) -> Result<()> {
    let source = FallbackSource::clipboard_then_prompt();
    add_from(store, url, &source)
}

fn add_from(store: &QueueStore, url: Option<&str>, source: &dyn UrlSource) -> Result<()> {
    let added = store.add(url, source)?;
    debug!(url = %added, source = source.name(), "add finished");
    Ok(())
}

pub(crate) fn run_remove_command(store: &QueueStore, url: &str) -> Result<()> {
    store.remove(url)?;
    info!(url, "Removed from queue");
    Ok(())
}

pub(crate) fn run_empty_command(store: &QueueStore) -> Result<()> {
    let removed = store.clear()?;
    info!(removed, "Queue emptied");
    Ok(())
}

pub(crate) fn run_version_command(out: &mut impl Write) -> Result<()> {
    writeln!(out, "nasutil {}", env!("CARGO_PKG_VERSION")).context("Failed to write version")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nasutil_core::{QueueError, StaticSource};
    use tempfile::TempDir;

    fn store() -> (QueueStore, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        (QueueStore::new(temp.path().join("queue.txt")), temp)
    }

    #[test]
    fn test_list_prints_sorted_urls() {
        let (store, _temp) = store();
        store.insert("https://x/b").expect("insert");
        store.insert("https://x/a").expect("insert");

        let mut out = Vec::new();
        run_list_command(&store, &mut out).expect("list");

        assert_eq!(String::from_utf8_lossy(&out), "https://x/a\nhttps://x/b\n");
    }

    #[test]
    fn test_list_on_missing_file_prints_nothing() {
        let (store, _temp) = store();
        let mut out = Vec::new();
        run_list_command(&store, &mut out).expect("list");
        assert!(out.is_empty());
    }

    #[test]
    fn test_add_from_source_normalizes() {
        let (store, _temp) = store();
        let source = StaticSource::new(Some("https://x/y&ref=1"));

        add_from(&store, None, &source).expect("add");

        assert_eq!(store.list().expect("list"), vec!["https://x/y"]);
    }

    #[test]
    fn test_remove_absent_url_fails() {
        let (store, _temp) = store();
        store.insert("https://x/a").expect("insert");

        let err = run_remove_command(&store, "https://x/zzz").expect_err("should fail");

        assert!(matches!(
            err.downcast_ref::<QueueError>(),
            Some(QueueError::NotFound(_))
        ));
        assert_eq!(store.len().expect("len"), 1);
    }

    #[test]
    fn test_empty_leaves_existing_empty_file() {
        let (store, _temp) = store();
        store.insert("https://x/a").expect("insert");

        run_empty_command(&store).expect("empty");

        assert!(store.path().exists());
        assert!(store.is_empty().expect("is_empty"));
    }

    #[test]
    fn test_version_output() {
        let mut out = Vec::new();
        run_version_command(&mut out).expect("version");
        assert_eq!(
            String::from_utf8_lossy(&out),
            format!("nasutil {}\n", env!("CARGO_PKG_VERSION"))
        );
    }
}
