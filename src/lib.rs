//! nasutil core library
//!
//! Keeps a small persistent queue of media URLs and drains it through an
//! external downloader (yt-dlp).
//!
//! # Architecture
//!
//! - [`queue`] - File-backed, deduplicated URL queue
//! - [`fetch`] - External fetch command, output streaming and classification
//! - [`drain`] - Drain engine: peek, fetch, confirm, remove
//! - [`input`] - Clipboard and prompt sources for URLs
//! - [`config`] - Explicit configuration injected into the store and engine

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod drain;
pub mod fetch;
pub mod input;
pub mod queue;

// Re-export commonly used types
pub use config::{
    ConfigError, ConfirmPolicy, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_IDLE_TIMEOUT_SECS,
    OUTPUT_DIR_ENV, QUEUE_FILE_ENV, QueueConfig, expand_tilde,
};
pub use drain::{DrainEngine, DrainError, DrainReport, DrainSummary};
pub use fetch::{
    FetchCommand, FetchError, FetchObserver, FetchOutcome, Fetcher, NoopObserver, OutputLine,
    OutputLines, Progress, ProcessFetcher, URL_PLACEHOLDER, classify_line,
};
pub use input::{
    ClipboardSource, FallbackSource, InputError, PromptSource, StaticSource, UrlSource,
};
pub use queue::{QueueError, QueueStore, normalize_url};
