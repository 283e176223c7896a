//! Normalization applied to every URL before it enters the queue.

use std::sync::LazyLock;

use regex::Regex;

/// Matches a whole markdown link `[title](target)`, capturing the target.
#[allow(clippy::expect_used)]
static MARKDOWN_LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    // Static pattern, safe to panic
    Regex::new(r"^\[[^\]]*\]\(([^)\s]+)\)$").expect("markdown link regex is valid")
});

/// Normalizes a raw URL for storage.
///
/// Trims whitespace, unwraps a pasted markdown link, then drops everything
/// from the first `&` onward so tracking-parameter variants collapse into one
/// entry. Returns `None` when nothing is left.
#[must_use]
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let target = MARKDOWN_LINK_PATTERN
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str());

    let kept = target.split('&').next().unwrap_or_default().trim();
    if kept.is_empty() {
        None
    } else {
        Some(kept.to_string())
    }
}
