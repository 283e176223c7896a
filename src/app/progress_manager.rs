//! Progress UI (spinner) for download runs.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use nasutil_core::{FetchObserver, Progress};
use tracing::{debug, info};

const TITLE_WIDTH: usize = 40;

/// Observer that renders fetch progress on a spinner, or logs it at debug level.
pub(crate) struct ProgressReporter {
    spinner: Option<ProgressBar>,
    title: Mutex<Option<String>>,
}

impl ProgressReporter {
    /// Creates the reporter; the spinner only ticks when `use_spinner` is set.
    pub(crate) fn new(use_spinner: bool) -> Self {
        let spinner = use_spinner.then(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner.set_message("Starting download...");
            spinner
        });
        Self {
            spinner,
            title: Mutex::new(None),
        }
    }

    pub(crate) fn finish(&self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish_and_clear();
        }
    }

    fn current_title(&self) -> Option<String> {
        self.title.lock().ok().and_then(|title| title.clone())
    }
}

impl FetchObserver for ProgressReporter {
    fn on_destination(&self, url: &str, path: &Path) {
        let title = short_title(path);
        if let Ok(mut slot) = self.title.lock() {
            *slot = Some(title.clone());
        }
        match &self.spinner {
            Some(spinner) => spinner.set_message(format!("{title}: starting")),
            None => info!(url, destination = %path.display(), "Downloading"),
        }
    }

    fn on_progress(&self, url: &str, progress: &Progress) {
        let message = format_progress(self.current_title().as_deref(), url, progress);
        match &self.spinner {
            Some(spinner) => spinner.set_message(message),
            None => debug!("{message}"),
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish();
    }
}

/// File stem of the destination, cut to a width that fits one terminal line.
fn short_title(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map_or_else(|| path.to_string_lossy(), |stem| stem.to_string_lossy());
    stem.chars().take(TITLE_WIDTH).collect()
}

fn format_progress(title: Option<&str>, url: &str, progress: &Progress) -> String {
    let label = title.unwrap_or(url);
    match &progress.eta {
        Some(eta) => format!("{label}: {:.1}% (ETA {eta})", progress.percent),
        None => format!("{label}: {:.1}%", progress.percent),
    }
}
