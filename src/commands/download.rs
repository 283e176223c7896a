//! Download command: drains the queue through the fetch command.

use std::io::{IsTerminal, Write};

use anyhow::{Context, Result};
use nasutil_core::{DrainEngine, DrainReport};
use tracing::error;

use crate::ProcessExit;
use crate::app::config_runtime::ResolvedConfig;
use crate::app::exit_handler;
use crate::app::progress_manager::ProgressReporter;
use crate::app::terminal;
use crate::cli::DownloadArgs;

pub(crate) async fn run_download_command(
    config: &ResolvedConfig,
    args: &DownloadArgs,
    quiet: bool,
) -> Result<ProcessExit> {
    let engine = DrainEngine::from_config(&config.queue, config.fetch_command.clone());
    let use_spinner = terminal::should_use_spinner(
        std::io::stderr().is_terminal(),
        quiet,
        terminal::is_dumb_terminal(),
    );
    let reporter = ProgressReporter::new(use_spinner);

    if args.once {
        let report = engine.drain_once(&reporter).await?;
        reporter.finish();
        print_report(&report, &mut std::io::stdout().lock())?;
        return Ok(exit_handler::exit_for_report(&report));
    }

    let summary = engine.drain_all(&reporter).await?;
    reporter.finish();
    let mut stdout = std::io::stdout().lock();
    for report in summary.reports() {
        print_report(report, &mut stdout)?;
    }
    Ok(exit_handler::exit_for_summary(&summary))
}

fn print_report(report: &DrainReport, out: &mut impl Write) -> Result<()> {
    match report {
        DrainReport::Idle => {}
        DrainReport::Consumed {
            destination: Some(destination),
            ..
        } => {
            writeln!(out, "{}", destination.display()).context("Failed to write report")?;
        }
        DrainReport::Consumed {
            url,
            destination: None,
            ..
        } => {
            writeln!(out, "{url}").context("Failed to write report")?;
        }
        DrainReport::Kept { url, error } => {
            error!(
                url = %url,
                exit_code = ?error.exit_code(),
                "Download failed, URL stays queued: {error}"
            );
        }
        DrainReport::Vanished {
            url,
            destination,
            error,
        } => {
            error!(
                url = %url,
                destination = ?destination,
                "URL was removed from the queue during its download: {error}"
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nasutil_core::QueueError;
    use std::path::PathBuf;

    #[test]
    fn test_print_report_writes_destination() {
        let report = DrainReport::Consumed {
            url: "https://x/a".to_string(),
            destination: Some(PathBuf::from("chan---clip.mp4")),
            late_failure: None,
        };
        let mut out = Vec::new();
        print_report(&report, &mut out).expect("print");
        assert_eq!(String::from_utf8_lossy(&out), "chan---clip.mp4\n");
    }

    #[test]
    fn test_print_report_falls_back_to_url() {
        let report = DrainReport::Consumed {
            url: "https://x/a".to_string(),
            destination: None,
            late_failure: None,
        };
        let mut out = Vec::new();
        print_report(&report, &mut out).expect("print");
        assert_eq!(String::from_utf8_lossy(&out), "https://x/a\n");
    }

    #[test]
    fn test_print_report_vanished_writes_nothing() {
        let report = DrainReport::Vanished {
            url: "https://x/a".to_string(),
            destination: Some(PathBuf::from("a.mp4")),
            error: QueueError::NotFound("https://x/a".to_string()),
        };
        let mut out = Vec::new();
        print_report(&report, &mut out).expect("print");
        assert!(out.is_empty());
    }

    #[test]
    fn test_print_report_idle_is_silent() {
        let mut out = Vec::new();
        print_report(&DrainReport::Idle, &mut out).expect("print");
        assert!(out.is_empty());
    }
}
