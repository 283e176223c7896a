//! Merges CLI flags, environment and the config file into runtime settings.
//!
//! Precedence is flag > environment > config file > built-in default. Clap
//! already folds the environment into the flag values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use nasutil_core::{FetchCommand, QueueConfig, expand_tilde};

use crate::app_config::FileConfig;
use crate::cli::{Cli, DownloadArgs};

/// Everything a command needs after configuration is resolved.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedConfig {
    pub(crate) queue: QueueConfig,
    pub(crate) fetch_command: FetchCommand,
}

pub(crate) fn resolve_config(
    cli: &Cli,
    download: Option<&DownloadArgs>,
    file_config: Option<&FileConfig>,
    home: Option<&Path>,
) -> Result<ResolvedConfig> {
    let queue_file = pick_path(
        cli.queue_file.as_ref(),
        file_config.and_then(|cfg| cfg.queue_file.as_ref()),
        home,
    );
    let output_dir = pick_path(
        cli.output_dir.as_ref(),
        file_config.and_then(|cfg| cfg.output_dir.as_ref()),
        home,
    );
    let mut queue = QueueConfig::from_locations(queue_file, output_dir)?;

    let fetch_timeout = download
        .and_then(|args| args.timeout)
        .or_else(|| file_config.and_then(|cfg| cfg.fetch_timeout_secs));
    if let Some(secs) = fetch_timeout {
        queue = queue.with_fetch_timeout(Duration::from_secs(secs));
    }

    let idle_timeout = download
        .and_then(|args| args.idle_timeout)
        .or_else(|| file_config.and_then(|cfg| cfg.idle_timeout_secs));
    if let Some(secs) = idle_timeout {
        queue = queue.with_idle_timeout(Duration::from_secs(secs));
    }

    let confirm = download
        .and_then(|args| args.confirm)
        .or_else(|| file_config.and_then(|cfg| cfg.confirm));
    if let Some(confirm) = confirm {
        queue = queue.with_confirm(confirm);
    }

    let program = non_empty(cli.fetch_program.as_deref()).or_else(|| {
        file_config.and_then(|cfg| non_empty(cfg.fetch_program.as_deref()))
    });
    let fetch_command = match program {
        Some(program) => {
            let expanded = expand_tilde(Path::new(program), home);
            FetchCommand::yt_dlp().with_program(expanded.to_string_lossy())
        }
        None => FetchCommand::yt_dlp(),
    };

    Ok(ResolvedConfig {
        queue,
        fetch_command,
    })
}

/// Default log filter: `-q` and `-v` win over the config file's verbosity.
pub(crate) fn default_log_level(cli: &Cli, file_config: Option<&FileConfig>) -> &'static str {
    if cli.quiet {
        return "error";
    }
    match cli.verbose {
        0 => file_config
            .and_then(|cfg| cfg.verbosity)
            .map_or("info", |verbosity| verbosity.log_level()),
        1 => "debug",
        _ => "trace",
    }
}

fn pick_path(
    cli_value: Option<&PathBuf>,
    file_value: Option<&PathBuf>,
    home: Option<&Path>,
) -> Option<PathBuf> {
    cli_value
        .filter(|path| !path.as_os_str().is_empty())
        .or(file_value)
        .map(|path| expand_tilde(path, home))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
