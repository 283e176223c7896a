//! Drain engine: peek a URL, fetch it, confirm, remove.
//!
//! A URL is only removed from the queue once the fetch command confirmed it
//! (see [`ConfirmPolicy`]); otherwise it stays queued for the next run.

mod error;

pub use error::DrainError;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::task::{JoinError, JoinHandle, spawn_blocking};
use tracing::{info, instrument, warn};

use crate::config::{ConfirmPolicy, QueueConfig};
use crate::fetch::{
    FetchCommand, FetchError, FetchObserver, FetchOutcome, Fetcher, Progress, ProcessFetcher,
};
use crate::queue::{QueueError, QueueStore};

/// Result of one drain cycle.
#[derive(Debug)]
pub enum DrainReport {
    /// Nothing was queued; no command was run.
    Idle,
    /// The URL was confirmed and removed from the queue.
    Consumed {
        /// The fetched URL.
        url: String,
        /// File announced by the fetch command.
        destination: Option<PathBuf>,
        /// Failure reported after the URL had already been removed
        /// (only possible with [`ConfirmPolicy::Started`]).
        late_failure: Option<FetchError>,
    },
    /// The fetch was not confirmed; the URL is still queued.
    Kept {
        /// The URL that stays queued.
        url: String,
        /// Why it was not confirmed.
        error: FetchError,
    },
    /// The URL disappeared from the queue while it was being fetched, so it
    /// could not be removed.
    Vanished {
        /// The fetched URL.
        url: String,
        /// File announced by the fetch command.
        destination: Option<PathBuf>,
        /// The removal failure.
        error: QueueError,
    },
}

impl DrainReport {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Kept { .. } | Self::Vanished { .. })
    }
}

/// Aggregate of a full-queue drain.
#[derive(Debug, Default)]
pub struct DrainSummary {
    reports: Vec<DrainReport>,
}

impl DrainSummary {
    /// URLs removed from the queue.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r, DrainReport::Consumed { .. }))
            .count()
    }

    /// URLs that failed, either kept after a failed fetch or lost during one.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.is_failure()).count()
    }

    /// True when nothing was attempted.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.reports.is_empty()
    }

    #[must_use]
    pub fn reports(&self) -> &[DrainReport] {
        &self.reports
    }
}

/// Drains the queue through a [`Fetcher`].
#[derive(Debug)]
pub struct DrainEngine<F> {
    store: QueueStore,
    fetcher: F,
    workdir: PathBuf,
    confirm: ConfirmPolicy,
}

impl DrainEngine<ProcessFetcher> {
    /// Builds an engine running `command` as a subprocess with the configured timeouts.
    #[must_use]
    pub fn from_config(config: &QueueConfig, command: FetchCommand) -> Self {
        let fetcher = ProcessFetcher::new(command, config.fetch_timeout, config.idle_timeout);
        Self::new(
            QueueStore::new(&config.queue_file),
            fetcher,
            &config.output_dir,
            config.confirm,
        )
    }
}

impl<F: Fetcher> DrainEngine<F> {
    pub fn new(
        store: QueueStore,
        fetcher: F,
        workdir: impl Into<PathBuf>,
        confirm: ConfirmPolicy,
    ) -> Self {
        Self {
            store,
            fetcher,
            workdir: workdir.into(),
            confirm,
        }
    }

    #[must_use]
    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    /// Runs at most one fetch cycle.
    ///
    /// # Errors
    ///
    /// Returns [`DrainError`] on queue or working-directory failures. Fetch
    /// failures are reported as [`DrainReport::Kept`].
    pub async fn drain_once(
        &self,
        observer: &dyn FetchObserver,
    ) -> Result<DrainReport, DrainError> {
        let url = match on_store(&self.store, QueueStore::take_one).await {
            Ok(url) => url,
            Err(err) if err.is_empty_queue() => {
                info!("queue is empty, nothing to download");
                return Ok(DrainReport::Idle);
            }
            Err(err) => return Err(err.into()),
        };
        self.drain_url(&url, observer).await
    }

    /// Attempts every queued URL once, isolating failures per URL.
    ///
    /// URLs that fail stay queued and are not retried within the same call.
    ///
    /// # Errors
    ///
    /// Returns [`DrainError`] on queue or working-directory failures.
    pub async fn drain_all(
        &self,
        observer: &dyn FetchObserver,
    ) -> Result<DrainSummary, DrainError> {
        let mut attempted = BTreeSet::new();
        let mut summary = DrainSummary::default();

        loop {
            let skip = attempted.clone();
            let next = on_store(&self.store, move |store| store.take_one_excluding(&skip)).await;
            let url = match next {
                Ok(url) => url,
                Err(err) if err.is_empty_queue() => break,
                Err(err) => return Err(err.into()),
            };
            attempted.insert(url.clone());
            let report = self.drain_url(&url, observer).await?;
            summary.reports.push(report);
        }

        if summary.is_idle() {
            info!("queue is empty, nothing to download");
        } else {
            info!(
                consumed = summary.consumed(),
                failed = summary.failed(),
                "drain finished"
            );
        }
        Ok(summary)
    }

    #[instrument(skip(self, observer))]
    async fn drain_url(
        &self,
        url: &str,
        observer: &dyn FetchObserver,
    ) -> Result<DrainReport, DrainError> {
        ensure_workdir(&self.workdir)?;

        let confirming = ConfirmingObserver {
            inner: observer,
            store: &self.store,
            url,
            remove_on_announce: self.confirm == ConfirmPolicy::Started,
            announced: Mutex::new(None),
            removal: Mutex::new(None),
        };
        let result = self.fetcher.fetch(url, &self.workdir, &confirming).await;
        let (announced, early_removal) = confirming.finish().await;

        let removed_early = match early_removal {
            None => false,
            Some(Ok(())) => true,
            Some(Err(error)) => {
                let destination = match &result {
                    Ok(outcome) => outcome.destination.clone().or(announced),
                    Err(_) => announced,
                };
                return vanished(url, destination, error);
            }
        };

        match result {
            Ok(outcome) => self.settle(url, outcome, removed_early).await,
            Err(error) if removed_early => {
                warn!(error = %error, "fetch failed after the URL was already consumed");
                Ok(DrainReport::Consumed {
                    url: url.to_string(),
                    destination: announced,
                    late_failure: Some(error),
                })
            }
            Err(error) => {
                warn!(error = %error, "fetch failed, URL stays queued");
                Ok(DrainReport::Kept {
                    url: url.to_string(),
                    error,
                })
            }
        }
    }

    async fn settle(
        &self,
        url: &str,
        outcome: FetchOutcome,
        removed_early: bool,
    ) -> Result<DrainReport, DrainError> {
        if !outcome.destination_seen() {
            warn!(
                exit_code = outcome.exit_code,
                "no destination announced, URL stays queued"
            );
            return Ok(DrainReport::Kept {
                url: url.to_string(),
                error: FetchError::NoDestination {
                    url: url.to_string(),
                    exit_code: outcome.exit_code,
                },
            });
        }

        let FetchOutcome {
            exit_code,
            success,
            destination,
        } = outcome;

        if removed_early {
            let late_failure = (!success).then(|| FetchError::ExitFailure {
                url: url.to_string(),
                exit_code,
                destination: destination.clone(),
            });
            if let Some(failure) = &late_failure {
                warn!(error = %failure, "fetch failed after the URL was already consumed");
            }
            return Ok(DrainReport::Consumed {
                url: url.to_string(),
                destination,
                late_failure,
            });
        }

        if !success {
            warn!(exit_code, "fetch exited unsuccessfully, URL stays queued");
            return Ok(DrainReport::Kept {
                url: url.to_string(),
                error: FetchError::ExitFailure {
                    url: url.to_string(),
                    exit_code,
                    destination,
                },
            });
        }

        let owned = url.to_string();
        if let Err(error) = on_store(&self.store, move |store| store.remove(&owned)).await {
            return vanished(url, destination, error);
        }
        info!(destination = ?destination, "download confirmed, URL removed");
        Ok(DrainReport::Consumed {
            url: url.to_string(),
            destination,
            late_failure: None,
        })
    }
}

/// Reports a URL that was gone before it could be removed; other queue errors are fatal.
fn vanished(
    url: &str,
    destination: Option<PathBuf>,
    error: QueueError,
) -> Result<DrainReport, DrainError> {
    if !matches!(error, QueueError::NotFound(_)) {
        return Err(error.into());
    }
    warn!(error = %error, "URL left the queue during its fetch");
    Ok(DrainReport::Vanished {
        url: url.to_string(),
        destination,
        error,
    })
}

/// Runs a blocking store operation (file lock and IO) off the async workers.
async fn on_store<T, Op>(store: &QueueStore, op: Op) -> Result<T, QueueError>
where
    T: Send + 'static,
    Op: FnOnce(&QueueStore) -> Result<T, QueueError> + Send + 'static,
{
    let store = store.clone();
    let path = store.path().to_path_buf();
    spawn_blocking(move || op(&store))
        .await
        .unwrap_or_else(|join| Err(join_failure(path, &join)))
}

fn join_failure(path: PathBuf, join: &JoinError) -> QueueError {
    QueueError::Io {
        path,
        source: std::io::Error::other(join.to_string()),
    }
}

fn ensure_workdir(dir: &Path) -> Result<(), DrainError> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|source| DrainError::Workdir {
        path: dir.to_path_buf(),
        source,
    })?;
    info!(dir = %dir.display(), "Created download directory");
    Ok(())
}

/// Forwards events, remembers the announced path and, for
/// [`ConfirmPolicy::Started`], starts removing the URL as soon as the
/// destination is announced.
struct ConfirmingObserver<'a> {
    inner: &'a dyn FetchObserver,
    store: &'a QueueStore,
    url: &'a str,
    remove_on_announce: bool,
    announced: Mutex<Option<PathBuf>>,
    removal: Mutex<Option<JoinHandle<Result<(), QueueError>>>>,
}

impl ConfirmingObserver<'_> {
    /// Returns the first announced path and the outcome of an early removal, if one ran.
    async fn finish(self) -> (Option<PathBuf>, Option<Result<(), QueueError>>) {
        let announced = self.announced.into_inner().unwrap_or_else(|p| p.into_inner());
        let removal = self.removal.into_inner().unwrap_or_else(|p| p.into_inner());
        let path = self.store.path().to_path_buf();
        let removed = match removal {
            Some(handle) => Some(
                handle
                    .await
                    .unwrap_or_else(|join| Err(join_failure(path, &join))),
            ),
            None => None,
        };
        (announced, removed)
    }
}

impl FetchObserver for ConfirmingObserver<'_> {
    fn on_destination(&self, url: &str, path: &Path) {
        self.inner.on_destination(url, path);
        if let Ok(mut announced) = self.announced.lock()
            && announced.is_none()
        {
            *announced = Some(path.to_path_buf());
        }
        if !self.remove_on_announce {
            return;
        }
        let Ok(mut removal) = self.removal.lock() else {
            return;
        };
        if removal.is_some() {
            return;
        }
        let store = self.store.clone();
        let owned = self.url.to_string();
        *removal = Some(spawn_blocking(move || {
            store.remove(&owned)?;
            info!(url = %owned, "fetch started, URL removed");
            Ok(())
        }));
    }

    fn on_progress(&self, url: &str, progress: &Progress) {
        self.inner.on_progress(url, progress);
    }
}
