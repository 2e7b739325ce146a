//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use drivefetch_core::EmptyFilterReport;
use drivefetch_core::config::MAX_PAGE_SIZE;

/// Config file name inside the per-user config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// File configuration for drivefetch defaults.
///
/// Every field is optional; unset fields fall back to built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Download root; relative paths resolve against the config file's directory.
    pub download_dir: Option<PathBuf>,
    /// Folder ids to scan (`"root"` is the top-level container).
    pub search_folders: Option<Vec<String>>,
    /// Extensions to keep, e.g. `[".mp3", ".m4a"]`.
    pub allowed_extensions: Option<Vec<String>>,
    /// Delete each file at the source after a verified download.
    pub delete_from_src: Option<bool>,
    /// OAuth client secret JSON.
    pub client_secret_file: Option<PathBuf>,
    /// Persisted OAuth token JSON.
    pub token_file: Option<PathBuf>,
    /// Listing page size (1..=1000).
    pub page_size: Option<u32>,
    /// Follow continuation tokens when listing.
    pub follow_next_page: Option<bool>,
    /// How to report a batch where nothing matched the extension filter.
    pub empty_filter_report: Option<EmptyFilterReport>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
    /// Drive API endpoint override.
    pub drive_api_base_url: Option<String>,
    /// Directory of the persistent run log.
    pub log_dir: Option<PathBuf>,
    /// Write the run log file at all.
    pub log_to_file: Option<bool>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(page_size) = self.page_size
            && !(1..=MAX_PAGE_SIZE).contains(&page_size)
        {
            bail!(
                "Invalid config value for `page_size`: {page_size}. Expected range: 1..={MAX_PAGE_SIZE}"
            );
        }

        validate_non_empty_list("search_folders", self.search_folders.as_deref())?;
        validate_non_empty_list("allowed_extensions", self.allowed_extensions.as_deref())?;

        if let Some(base_url) = &self.drive_api_base_url
            && url::Url::parse(base_url).is_err()
        {
            bail!("Invalid config value for `drive_api_base_url`: '{base_url}' is not a URL");
        }

        Ok(())
    }
}

fn validate_non_empty_list(field: &str, values: Option<&[String]>) -> Result<()> {
    let Some(values) = values else {
        return Ok(());
    };
    if values.is_empty() {
        bail!("Invalid config value for `{field}`: expected at least one entry");
    }
    if values.iter().any(|value| value.trim().is_empty()) {
        bail!("Invalid config value for `{field}`: entries must not be blank");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Returns the stable string label for display output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Quiet => "quiet",
            Self::Debug => "debug",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if one is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

impl LoadedConfig {
    /// Path of the config file that was actually loaded.
    #[must_use]
    pub fn loaded_path(&self) -> Option<&Path> {
        self.config.as_ref().and(self.path.as_deref())
    }

    /// Directory relative config paths resolve against, when a file was loaded.
    #[must_use]
    pub fn base_dir(&self) -> Option<&Path> {
        self.config.as_ref()?;
        self.path.as_deref().and_then(Path::parent)
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/drivefetch/config.toml`
/// 2. `$HOME/.config/drivefetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("drivefetch")
                .join(CONFIG_FILE_NAME),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("drivefetch")
            .join(CONFIG_FILE_NAME),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from `explicit` (must exist) or the default path (optional).
pub fn load_file_config_from(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        if !path.is_file() {
            bail!("Config file '{}' does not exist", path.display());
        }
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

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

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_no = line_index + 1;
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "download_dir" => {
                cfg.download_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "search_folders" => {
                cfg.search_folders = Some(parse_string_array(value).with_context(invalid)?);
            }
            "allowed_extensions" => {
                cfg.allowed_extensions = Some(parse_string_array(value).with_context(invalid)?);
            }
            "delete_from_src" => {
                cfg.delete_from_src = Some(parse_boolean(value).with_context(invalid)?);
            }
            "client_secret_file" => {
                cfg.client_secret_file = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "token_file" => {
                cfg.token_file = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "page_size" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                let n = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("page_size out of range for u32"))?;
                cfg.page_size = Some(n);
            }
            "follow_next_page" => {
                cfg.follow_next_page = Some(parse_boolean(value).with_context(invalid)?);
            }
            "empty_filter_report" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                let report = parsed.parse::<EmptyFilterReport>().map_err(|e| {
                    anyhow::anyhow!("Invalid `empty_filter_report` value '{parsed}' on line {line_no}: {e}")
                })?;
                cfg.empty_filter_report = Some(report);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            "log_dir" => {
                cfg.log_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "log_to_file" => {
                cfg.log_to_file = Some(parse_boolean(value).with_context(invalid)?);
            }
            "drive_api_base_url" => {
                cfg.drive_api_base_url = Some(parse_string_literal(value).with_context(invalid)?);
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
    let inner = &raw_value[1..raw_value.len() - 1];
    if inner.contains('"') {
        bail!("Unexpected quote inside string");
    }
    Ok(inner.to_string())
}

/// Parses `["a", "b"]`. A trailing comma is accepted.
fn parse_string_array(raw_value: &str) -> Result<Vec<String>> {
    let Some(inner) = raw_value
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        bail!("Expected array of double-quoted strings, e.g. [\"a\", \"b\"]");
    };

    let mut items = Vec::new();
    let mut rest = inner.trim();
    while !rest.is_empty() {
        let Some(after_open) = rest.strip_prefix('"') else {
            bail!("Expected double-quoted string in array");
        };
        let Some(close) = after_open.find('"') else {
            bail!("Unterminated string in array");
        };
        items.push(after_open[..close].to_string());

        rest = after_open[close + 1..].trim_start();
        if rest.is_empty() {
            break;
        }
        let Some(after_comma) = rest.strip_prefix(',') else {
            bail!("Expected ',' between array items");
        };
        rest = after_comma.trim_start();
    }
    Ok(items)
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
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, quiet, debug"),
    }
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
