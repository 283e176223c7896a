//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use nasutil_core::ConfirmPolicy;

/// TOML-like file configuration for nasutil defaults.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    /// Queue file holding pending URLs.
    pub queue_file: Option<PathBuf>,
    /// Working directory for downloads.
    pub output_dir: Option<PathBuf>,
    /// Executable used instead of `yt-dlp`.
    pub fetch_program: Option<String>,
    /// Overall limit for one fetch in seconds.
    pub fetch_timeout_secs: Option<u64>,
    /// Limit on output silence in seconds.
    pub idle_timeout_secs: Option<u64>,
    /// When a fetched URL is removed from the queue.
    pub confirm: Option<ConfirmPolicy>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        validate_range("fetch_timeout_secs", self.fetch_timeout_secs, 1..=86_400)?;
        validate_range("idle_timeout_secs", self.idle_timeout_secs, 1..=3_600)?;
        Ok(())
    }
}

fn validate_range(
    field: &str,
    value: Option<u64>,
    range: std::ops::RangeInclusive<u64>,
) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !range.contains(&value) {
        bail!(
            "Invalid config value for `{field}`: {value}. Expected range: {}..={}",
            range.start(),
            range.end()
        );
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Returns the tracing filter used when no CLI flag overrides it.
    #[must_use]
    pub fn log_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/nasutil/config.toml`
/// 2. `$HOME/.config/nasutil/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("nasutil")
                .join("config.toml"),
        );
    }

    let home = home_dir()?;
    Some(home.join(".config").join("nasutil").join("config.toml"))
}

/// Returns `$HOME` when set and non-empty.
#[must_use]
pub fn home_dir() -> Option<PathBuf> {
    env_var_non_empty_os("HOME").map(PathBuf::from)
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig { path, config: None });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig { path, config: None });
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let line_no = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "queue_file" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `queue_file` value on line {line_no}"))?;
                cfg.queue_file = Some(PathBuf::from(parsed));
            }
            "output_dir" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `output_dir` value on line {line_no}"))?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "fetch_program" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `fetch_program` value on line {line_no}"))?;
                cfg.fetch_program = Some(parsed);
            }
            "fetch_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `fetch_timeout_secs` value on line {line_no}")
                })?;
                cfg.fetch_timeout_secs = Some(parsed);
            }
            "idle_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `idle_timeout_secs` value on line {line_no}")
                })?;
                cfg.idle_timeout_secs = Some(parsed);
            }
            "confirm" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `confirm` value on line {line_no}"))?;
                cfg.confirm = Some(parsed.parse::<ConfirmPolicy>().with_context(|| {
                    format!("Invalid `confirm` value '{parsed}' on line {line_no}")
                })?);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `verbosity` value on line {line_no}"))?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_locations() {
        let cfg = parse_config_str(
            r#"
queue_file = "~/.nasutil-to-download.txt"
output_dir = "/media/nas/syncthing"
"#,
        )
        .expect("locations should parse");
        assert_eq!(
            cfg.queue_file,
            Some(PathBuf::from("~/.nasutil-to-download.txt"))
        );
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/media/nas/syncthing")));
        assert!(cfg.fetch_program.is_none());
    }

    #[test]
    fn test_parse_config_fetch_settings() {
        let cfg = parse_config_str(
            r#"
fetch_program = "/usr/local/bin/yt-dlp"
fetch_timeout_secs = 7200
idle_timeout_secs = 120
confirm = "started"
"#,
        )
        .expect("fetch settings should parse");
        assert_eq!(cfg.fetch_program.as_deref(), Some("/usr/local/bin/yt-dlp"));
        assert_eq!(cfg.fetch_timeout_secs, Some(7200));
        assert_eq!(cfg.idle_timeout_secs, Some(120));
        assert_eq!(cfg.confirm, Some(ConfirmPolicy::Started));
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r#"
idle_timeout_secs = 60 # seconds
verbosity = "quiet" # preferred noise level
output_dir = "/srv/#media" # hash inside quotes is kept
"#,
        )
        .expect("config with comments should parse");
        assert_eq!(cfg.idle_timeout_secs, Some(60));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Quiet));
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/srv/#media")));
    }

    #[test]
    fn test_parse_config_rejects_zero_idle_timeout() {
        let err = parse_config_str("idle_timeout_secs = 0").expect_err("invalid timeout expected");
        assert!(err.to_string().contains("idle_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_fetch_timeout_over_a_day() {
        let err =
            parse_config_str("fetch_timeout_secs = 86401").expect_err("invalid timeout expected");
        assert!(err.to_string().contains("fetch_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_path() {
        let err = parse_config_str("queue_file = /tmp/q.txt").expect_err("quotes required");
        assert!(format!("{err:#}").contains("queue_file"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_confirm_policy() {
        let err = parse_config_str(r#"confirm = "eventually""#).expect_err("bad policy expected");
        assert!(format!("{err:#}").contains("confirm"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("unknown_key = 123").expect_err("unknown key error expected");
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("unknown_key"));
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("queue_file").expect_err("syntax error expected");
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_verbosity_log_level() {
        assert_eq!(VerbositySetting::Default.log_level(), "info");
        assert_eq!(VerbositySetting::Verbose.log_level(), "debug");
        assert_eq!(VerbositySetting::Quiet.log_level(), "error");
        assert_eq!(VerbositySetting::Debug.log_level(), "trace");
    }
}
