//! CLI command routing.
//!
//! Loads the config file, installs logging, resolves the queue and download
//! settings, then runs the handler for the chosen subcommand.

use anyhow::Result;
use nasutil_core::QueueStore;
use tracing::debug;

use crate::app::{config_runtime, terminal};
use crate::cli::{Cli, Command};
use crate::{ProcessExit, app_config, commands};

/// Runs the subcommand in `cli` and returns the exit outcome.
pub(crate) async fn dispatch(cli: &Cli) -> Result<ProcessExit> {
    if cli.command == Command::Version {
        commands::run_version_command(&mut std::io::stdout().lock())?;
        return Ok(ProcessExit::Success);
    }

    let loaded = app_config::load_default_file_config();
    let file_config = loaded.as_ref().ok().and_then(|l| l.config.as_ref());
    terminal::init_tracing(
        config_runtime::default_log_level(cli, file_config),
        terminal::is_no_color_requested(cli),
    );
    let loaded = loaded?;
    debug!(
        path = ?loaded.path,
        from_file = loaded.config.is_some(),
        "Configuration file resolved"
    );

    let download_args = match &cli.command {
        Command::Download(args) => Some(args),
        _ => None,
    };
    let resolved = config_runtime::resolve_config(
        cli,
        download_args,
        loaded.config.as_ref(),
        app_config::home_dir().as_deref(),
    )?;
    debug!(config = ?resolved.queue, "Configuration resolved");

    let store = QueueStore::new(&resolved.queue.queue_file);
    match &cli.command {
        Command::List => commands::run_list_command(&store, &mut std::io::stdout().lock())?,
        Command::Add { url } => commands::run_add_command(&store, url.as_deref())?,
        Command::Remove { url } => commands::run_remove_command(&store, url)?,
        Command::Empty => commands::run_empty_command(&store)?,
        Command::Download(args) => {
            return commands::run_download_command(&resolved, args, cli.quiet).await;
        }
        Command::Version => {}
    }
    Ok(ProcessExit::Success)
}
