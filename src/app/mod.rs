//! Application runtime composition modules.

pub(crate) mod command_dispatcher;
pub(crate) mod config_runtime;
pub(crate) mod exit_handler;
pub(crate) mod progress_manager;
pub(crate) mod terminal;
