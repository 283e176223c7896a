//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use nasutil_core::{ConfirmPolicy, OUTPUT_DIR_ENV, QUEUE_FILE_ENV};

/// Environment variable overriding the fetch program.
pub const FETCH_PROGRAM_ENV: &str = "NASUTIL_FETCH_PROGRAM";

/// Queue media URLs and download them later with yt-dlp.
#[derive(Parser, Debug)]
#[command(name = "nasutil")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Queue file holding pending URLs
    #[arg(long, global = true, env = QUEUE_FILE_ENV, value_name = "PATH")]
    pub queue_file: Option<PathBuf>,

    /// Directory downloads are written into
    #[arg(long, global = true, env = OUTPUT_DIR_ENV, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Downloader executable (defaults to yt-dlp)
    #[arg(long, global = true, env = FETCH_PROGRAM_ENV, value_name = "PROGRAM")]
    pub fetch_program: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print every queued URL
    #[command(visible_aliases = ["ls", "l"])]
    List,

    /// Queue a URL (reads the clipboard, then prompts, when omitted)
    #[command(visible_alias = "a")]
    Add {
        /// URL to queue
        url: Option<String>,
    },

    /// Remove a queued URL
    #[command(visible_alias = "rm")]
    Remove {
        /// URL to remove, exactly as listed
        url: String,
    },

    /// Download queued URLs
    #[command(visible_aliases = ["d", "dl"])]
    Download(DownloadArgs),

    /// Remove every queued URL
    #[command(visible_aliases = ["e", "clear"])]
    Empty,

    /// Print the program version
    #[command(visible_alias = "v")]
    Version,
}

/// Options for the `download` command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadArgs {
    /// Download a single URL instead of draining the whole queue
    #[arg(long)]
    pub once: bool,

    /// Overall limit for one download in seconds (1-86400)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=86_400))]
    pub timeout: Option<u64>,

    /// Maximum silence from the downloader in seconds (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3_600))]
    pub idle_timeout: Option<u64>,

    /// When a URL is removed: after a clean exit, or once the download starts
    #[arg(long, value_name = "POLICY", value_parser = parse_confirm)]
    pub confirm: Option<ConfirmPolicy>,
}

fn parse_confirm(raw: &str) -> Result<ConfirmPolicy, String> {
    raw.parse::<ConfirmPolicy>().map_err(|err| err.to_string())
}
