//! File configuration for crawl defaults.
//!
//! The file is a flat `key = value` list with `#` comments:
//!
//! ```text
//! output_dir = "/srv/provas"
//! max_pages = 20
//! concurrency = 2          # parallel downloads
//! rate_limit_ms = 500
//! term_delay_ms = 1000
//! connect_timeout_secs = 30
//! read_timeout_secs = 300
//! log_file = "leecher.log"
//! terms = ["ti", "direito"]
//! ```
//!
//! Every key is optional; the binary layers CLI flags over these values and
//! built-in defaults under them.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};

/// Directory name under the user config dir.
pub const CONFIG_DIR_NAME: &str = "leecher";

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Parsed config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub output_dir: Option<PathBuf>,
    pub max_pages: Option<u32>,
    pub concurrency: Option<usize>,
    /// Minimum spacing between same-host downloads, in milliseconds.
    pub rate_limit_ms: Option<u64>,
    pub term_delay_ms: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
    pub terms: Option<Vec<String>>,
}

impl FileConfig {
    /// Validates value ranges.
    ///
    /// # Errors
    ///
    /// Names the first offending key and its accepted range.
    pub fn validate(&self) -> Result<()> {
        validate_range("max_pages", self.max_pages.map(u64::from), 1, 500)?;
        validate_range(
            "concurrency",
            self.concurrency.and_then(|v| u64::try_from(v).ok()),
            1,
            16,
        )?;
        validate_range("rate_limit_ms", self.rate_limit_ms, 0, 60_000)?;
        validate_range("term_delay_ms", self.term_delay_ms, 0, 60_000)?;
        validate_range("connect_timeout_secs", self.connect_timeout_secs, 1, 3600)?;
        validate_range("read_timeout_secs", self.read_timeout_secs, 1, 3600)?;

        if let Some(terms) = &self.terms
            && terms.iter().any(|term| term.trim().is_empty())
        {
            bail!("Invalid config value for `terms`: terms must not be blank");
        }
        Ok(())
    }
}

fn validate_range(field: &str, value: Option<u64>, min: u64, max: u64) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(min..=max).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: {min}..={max}");
    }
    Ok(())
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/leecher/config.toml`
/// 2. `$HOME/.config/leecher/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist; the default path is optional and a missing
/// file yields the empty config.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return read_file_config(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

/// Parses and validates config text.
///
/// # Errors
///
/// Returns an error naming the line of a syntax error or unknown key, or
/// the key that fails validation.
pub fn parse_config_str(raw: &str) -> Result<FileConfig> {
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
        let context = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "log_file" => {
                cfg.log_file = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "max_pages" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                cfg.max_pages = Some(
                    u32::try_from(parsed)
                        .map_err(|_| anyhow!("max_pages out of range for u32"))
                        .with_context(context)?,
                );
            }
            "concurrency" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                cfg.concurrency = Some(
                    usize::try_from(parsed)
                        .map_err(|_| anyhow!("concurrency out of range for usize"))
                        .with_context(context)?,
                );
            }
            "rate_limit_ms" => {
                cfg.rate_limit_ms = Some(parse_integer_u64(value).with_context(context)?);
            }
            "term_delay_ms" => {
                cfg.term_delay_ms = Some(parse_integer_u64(value).with_context(context)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "terms" => cfg.terms = Some(parse_string_array(value).with_context(context)?),
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
    let raw_value = raw_value.trim();
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_string_array(raw_value: &str) -> Result<Vec<String>> {
    let inner = raw_value
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| anyhow!("Expected an array of double-quoted strings"))?;
    inner
        .split(',')
        .map(str::trim)
        .filter(|element| !element.is_empty())
        .map(parse_string_literal)
        .collect()
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
    u64::try_from(value).map_err(|_| anyhow!("Integer value out of range for u64"))
}
