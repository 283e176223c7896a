//! CLI entry point for nasutil.

use std::process::ExitCode;

use clap::Parser;

mod app;
mod app_config;
mod cli;
mod commands;

use cli::Cli;

/// Outcome mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    Success,
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::FAILURE,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse before tracing so --help and usage errors print without logs
    let cli = Cli::parse();

    match app::command_dispatcher::dispatch(&cli).await {
        Ok(exit) => exit.into(),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(ProcessExit::Failure)
        }
    }
}
