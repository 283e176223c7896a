//! External fetch command.
//!
//! Spawns the downloader for one URL, streams its stdout line by line and
//! reports what it announced through a [`FetchOutcome`]. The child is killed
//! on timeout and on every early return.

mod error;
mod lines;
mod output;

pub use error::FetchError;
pub use lines::OutputLines;
pub use output::{OutputLine, Progress, classify_line};

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::BufReader;
use tokio::process::{Child, Command};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, instrument, trace, warn};

/// Placeholder replaced by the URL in command arguments.
pub const URL_PLACEHOLDER: &str = "{url}";

/// Program and argument template for the fetch command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCommand {
    program: String,
    args: Vec<String>,
}

impl FetchCommand {
    /// Creates a command; every `{url}` argument is replaced at fetch time.
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// yt-dlp with best mp4 video+audio, no playlists, `uploader---title.ext` names.
    #[must_use]
    pub fn yt_dlp() -> Self {
        Self::new(
            "yt-dlp",
            [
                "-f",
                "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
                "--no-playlist",
                "--progress",
                "--merge-output-format",
                "mp4",
                URL_PLACEHOLDER,
                "-o",
                "%(uploader)s---%(title)s.%(ext)s",
                "--restrict-filenames",
            ],
        )
    }

    /// Same arguments, different executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the arguments with `{url}` substituted.
    #[must_use]
    pub fn render_args(&self, url: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(URL_PLACEHOLDER, url))
            .collect()
    }
}

impl Default for FetchCommand {
    fn default() -> Self {
        Self::yt_dlp()
    }
}

/// What the fetch command reported.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchOutcome {
    /// Exit code; `None` when killed by a signal.
    pub exit_code: Option<i32>,
    /// Whether the process exited successfully.
    pub success: bool,
    /// Announced file; the merged output replaces the first announcement when present.
    pub destination: Option<PathBuf>,
}

impl FetchOutcome {
    /// True once a destination (or already-downloaded) line was seen.
    #[must_use]
    pub fn destination_seen(&self) -> bool {
        self.destination.is_some()
    }
}

/// Receives events while a fetch is running.
pub trait FetchObserver: Send + Sync {
    /// Called once, on the first destination or already-downloaded line.
    fn on_destination(&self, _url: &str, _path: &Path) {}

    /// Called for every progress line.
    fn on_progress(&self, _url: &str, _progress: &Progress) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FetchObserver for NoopObserver {}

/// Runs one fetch for a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` with `workdir` as the current directory.
    ///
    /// A non-zero exit is reported in the outcome, not as an error.
    async fn fetch(
        &self,
        url: &str,
        workdir: &Path,
        observer: &dyn FetchObserver,
    ) -> Result<FetchOutcome, FetchError>;
}

/// [`Fetcher`] backed by a real subprocess.
#[derive(Debug, Clone)]
pub struct ProcessFetcher {
    command: FetchCommand,
    fetch_timeout: Duration,
    idle_timeout: Duration,
}

impl ProcessFetcher {
    #[must_use]
    pub fn new(command: FetchCommand, fetch_timeout: Duration, idle_timeout: Duration) -> Self {
        Self {
            command,
            fetch_timeout,
            idle_timeout,
        }
    }
}

#[async_trait]
impl Fetcher for ProcessFetcher {
    #[instrument(skip(self, observer), fields(program = %self.command.program))]
    async fn fetch(
        &self,
        url: &str,
        workdir: &Path,
        observer: &dyn FetchObserver,
    ) -> Result<FetchOutcome, FetchError> {
        let deadline = Instant::now() + self.fetch_timeout;
        let mut child = Command::new(&self.command.program)
            .args(self.command.render_args(url))
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FetchError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;
        debug!(pid = child.id(), "fetch command started");

        let Some(stdout) = child.stdout.take() else {
            terminate(&mut child).await;
            return Err(FetchError::Io {
                url: url.to_string(),
                source: std::io::Error::other("stdout was not captured"),
            });
        };
        let mut lines = OutputLines::new(BufReader::new(stdout));
        let mut destination: Option<PathBuf> = None;

        loop {
            let next_line = timeout(self.idle_timeout, lines.next_line());
            let next = match timeout_at(deadline, next_line).await {
                Ok(Ok(next)) => next,
                Ok(Err(_)) => {
                    terminate(&mut child).await;
                    return Err(timed_out(url, self.idle_timeout, "idle"));
                }
                Err(_) => {
                    terminate(&mut child).await;
                    return Err(timed_out(url, self.fetch_timeout, "overall"));
                }
            };
            let line = match next {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(source) => {
                    terminate(&mut child).await;
                    return Err(FetchError::Io {
                        url: url.to_string(),
                        source,
                    });
                }
            };

            let classified = classify_line(&line);
            if let Some(path) = classified.announced_path() {
                if destination.is_none() {
                    info!(destination = %path.display(), "fetch started");
                    observer.on_destination(url, path);
                    destination = Some(path.clone());
                }
                continue;
            }
            match classified {
                OutputLine::Merged(path) => {
                    debug!(destination = %path.display(), "formats merged");
                    destination = Some(path);
                }
                OutputLine::Progress(progress) => observer.on_progress(url, &progress),
                _ => trace!(line = %line, "fetch output"),
            }
        }

        let status = match timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(source)) => {
                return Err(FetchError::Io {
                    url: url.to_string(),
                    source,
                });
            }
            Err(_) => {
                terminate(&mut child).await;
                return Err(timed_out(url, self.fetch_timeout, "overall"));
            }
        };

        if !status.success() {
            warn!(status = %status, "fetch command exited unsuccessfully");
        }
        Ok(FetchOutcome {
            exit_code: status.code(),
            success: status.success(),
            destination,
        })
    }
}

fn timed_out(url: &str, after: Duration, kind: &'static str) -> FetchError {
    FetchError::TimedOut {
        url: url.to_string(),
        after,
        kind,
    }
}

/// Kills and reaps the child so no orphan outlives the fetch.
async fn terminate(child: &mut Child) {
    if let Err(err) = child.kill().await {
        debug!(error = %err, "failed to kill fetch command");
    }
}
