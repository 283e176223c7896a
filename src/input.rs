//! Input sources consulted when `add` is called without a URL.

use std::io::{self, BufRead, Write};

use arboard::Clipboard;
use thiserror::Error;
use tracing::debug;

/// Errors raised by an input source.
#[derive(Debug, Error)]
pub enum InputError {
    /// The system clipboard could not be opened or read.
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    /// Reading the interactive prompt failed.
    #[error("failed to read URL from prompt: {0}")]
    Prompt(#[source] io::Error),
}

/// Something that can produce a URL on demand.
pub trait UrlSource {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// Returns a URL, or `None` when the source has nothing to offer.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] when the source itself fails.
    fn read_url(&self) -> Result<Option<String>, InputError>;
}

/// Reads text from the system clipboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClipboardSource;

impl UrlSource for ClipboardSource {
    fn name(&self) -> &'static str {
        "clipboard"
    }

    fn read_url(&self) -> Result<Option<String>, InputError> {
        let mut clipboard = Clipboard::new().map_err(|e| InputError::Clipboard(e.to_string()))?;
        let text = clipboard
            .get_text()
            .map_err(|e| InputError::Clipboard(e.to_string()))?;
        Ok(non_blank(&text))
    }
}

/// Prompts on stdout and reads a single line from stdin.
#[derive(Debug, Clone)]
pub struct PromptSource {
    prompt: String,
}

impl PromptSource {
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }

    /// Prompts on `output` and reads one line from `input`.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::Prompt`] on IO failure.
    pub fn read_from<R: BufRead, W: Write>(
        &self,
        mut input: R,
        mut output: W,
    ) -> Result<Option<String>, InputError> {
        write!(output, "{}", self.prompt).map_err(InputError::Prompt)?;
        output.flush().map_err(InputError::Prompt)?;
        let mut line = String::new();
        input.read_line(&mut line).map_err(InputError::Prompt)?;
        Ok(non_blank(&line))
    }
}

impl Default for PromptSource {
    fn default() -> Self {
        Self::new("URL: ")
    }
}

impl UrlSource for PromptSource {
    fn name(&self) -> &'static str {
        "prompt"
    }

    fn read_url(&self) -> Result<Option<String>, InputError> {
        self.read_from(io::stdin().lock(), io::stdout())
    }
}

/// Tries `primary` first and falls back to `secondary` when it is empty or fails.
pub struct FallbackSource<P, S> {
    primary: P,
    secondary: S,
}

impl<P: UrlSource, S: UrlSource> FallbackSource<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl FallbackSource<ClipboardSource, PromptSource> {
    /// Clipboard first, then an interactive `URL: ` prompt.
    #[must_use]
    pub fn clipboard_then_prompt() -> Self {
        Self::new(ClipboardSource, PromptSource::default())
    }
}

impl<P: UrlSource, S: UrlSource> UrlSource for FallbackSource<P, S> {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    fn read_url(&self) -> Result<Option<String>, InputError> {
        match self.primary.read_url() {
            Ok(Some(url)) => return Ok(Some(url)),
            Ok(None) => debug!(source = self.primary.name(), "input source was empty"),
            Err(err) => debug!(source = self.primary.name(), error = %err, "input source failed"),
        }
        self.secondary.read_url()
    }
}

/// Source returning a fixed value, for scripted use and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    value: Option<String>,
}

impl StaticSource {
    #[must_use]
    pub fn new(value: Option<&str>) -> Self {
        Self {
            value: value.map(ToString::to_string),
        }
    }
}

impl UrlSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    fn read_url(&self) -> Result<Option<String>, InputError> {
        Ok(self.value.as_deref().and_then(non_blank))
    }
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
