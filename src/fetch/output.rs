//! Classification of yt-dlp output lines.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static DESTINATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    // Static pattern, safe to panic
    Regex::new(r"^\[download\] Destination: (.+)$").expect("destination regex is valid")
});

#[allow(clippy::expect_used)]
static ALREADY_DOWNLOADED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[download\] (.+) has already been downloaded")
        .expect("already-downloaded regex is valid")
});

#[allow(clippy::expect_used)]
static MERGER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\[Merger\] Merging formats into "(.+)"$"#).expect("merger regex is valid")
});

#[allow(clippy::expect_used)]
static PROGRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[download\]\s+(\d+(?:\.\d+)?)%(?:.*\bETA\s+(\S+))?")
        .expect("progress regex is valid")
});

/// Download progress reported by the fetch command.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Percentage of the current file, 0.0..=100.0.
    pub percent: f32,
    /// Remaining time as printed by the tool (`00:12`, `Unknown`), if shown.
    pub eta: Option<String>,
}

/// Meaning of one line of fetch output.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputLine {
    /// `[download] Destination: <path>` - a file is being written.
    Destination(PathBuf),
    /// `[download] <path> has already been downloaded` - nothing left to fetch.
    AlreadyDownloaded(PathBuf),
    /// `[Merger] Merging formats into "<path>"` - the final merged file.
    Merged(PathBuf),
    /// A progress update.
    Progress(Progress),
    /// Anything else.
    Other,
}

impl OutputLine {
    /// Returns the announced path for lines that confirm a fetch has started.
    #[must_use]
    pub fn announced_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Destination(path) | Self::AlreadyDownloaded(path) => Some(path),
            Self::Merged(_) | Self::Progress(_) | Self::Other => None,
        }
    }
}

/// Classifies a single output line (without its terminator).
#[must_use]
pub fn classify_line(line: &str) -> OutputLine {
    let line = line.trim();

    if let Some(caps) = DESTINATION_PATTERN.captures(line) {
        return OutputLine::Destination(PathBuf::from(caps[1].trim()));
    }
    if let Some(caps) = ALREADY_DOWNLOADED_PATTERN.captures(line) {
        return OutputLine::AlreadyDownloaded(PathBuf::from(caps[1].trim()));
    }
    if let Some(caps) = MERGER_PATTERN.captures(line) {
        return OutputLine::Merged(PathBuf::from(&caps[1]));
    }
    if let Some(caps) = PROGRESS_PATTERN.captures(line)
        && let Ok(percent) = caps[1].parse::<f32>()
    {
        return OutputLine::Progress(Progress {
            percent,
            eta: caps.get(2).map(|m| m.as_str().to_string()),
        });
    }

    OutputLine::Other
}
