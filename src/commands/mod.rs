//! CLI command handlers.

mod download;
mod queue;

pub(crate) use download::run_download_command;
pub(crate) use queue::{
    run_add_command, run_empty_command, run_list_command, run_remove_command,
    run_version_command,
};
