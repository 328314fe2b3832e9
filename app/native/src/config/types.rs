//! Configuration types and loading.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::hook::CallSite;

/// Default signature for the per-tick input routine's call site.
pub const DEFAULT_INPUT_SIGNATURE: &str = "E8 ?? ?? ?? ?? 83 7B 58 00";

/// Default signature for the key-message routine.
pub const DEFAULT_KEY_MESSAGE_SIGNATURE: &str = "48 89 5C 24 ?? 55 56 57 41 56 41 57 48 8D 6C 24 ?? 48 81 EC ?? ?? ?? ?? 48 8B 05 ?? ?? ?? ?? 48 33 C4 48 89 45 40 4D 8B F9";

/// Name of the per-tick input call site.
pub const INPUT_SITE: &str = "input";

/// Name of the key-message call site.
pub const KEY_MESSAGE_SITE: &str = "keyMessage";

/// Root configuration for the interception engine.
///
/// Every field has a default, so an empty file (or no file) is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Whether `init` installs the interception points at all.
    pub enabled: bool,

    /// Default tracing filter, used when `RUST_LOG` is not set.
    pub log_level: String,

    /// Logs every dispatched occurrence at debug level instead of trace.
    pub trace_occurrences: bool,

    /// Locator inputs for the two call sites.
    pub call_sites: CallSiteConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
            trace_occurrences: false,
            call_sites: CallSiteConfig::default(),
        }
    }
}

/// Locator inputs for the interception points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallSiteConfig {
    /// Signature of the call into the per-tick input routine.
    pub input: String,

    /// Signature of the key-message routine.
    pub key_message: String,
}

impl Default for CallSiteConfig {
    fn default() -> Self {
        Self {
            input: DEFAULT_INPUT_SIGNATURE.to_string(),
            key_message: DEFAULT_KEY_MESSAGE_SIGNATURE.to_string(),
        }
    }
}

impl CallSiteConfig {
    #[must_use]
    pub fn input_site(&self) -> CallSite { CallSite::new(INPUT_SITE, &self.input) }

    #[must_use]
    pub fn key_message_site(&self) -> CallSite { CallSite::new(KEY_MESSAGE_SITE, &self.key_message) }
}

/// Errors that can occur when loading the configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    NotFound,
    /// The configuration file exists but could not be read.
    IoError(std::io::Error),
    /// The configuration file contains invalid JSON.
    ParseError(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(
                f,
                "No configuration file found. Expected at ~/.config/input-intercept/config.jsonc"
            ),
            Self::IoError(err) => write!(f, "Failed to read configuration file: {err}"),
            Self::ParseError(err) => write!(f, "Failed to parse configuration file: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(err) => Some(err),
            Self::ParseError(err) => Some(err),
            Self::NotFound => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err) }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self { Self::ParseError(err) }
}

/// Directory name under each config root.
const CONFIG_DIR_NAME: &str = "input-intercept";

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Returns the possible configuration file paths in priority order.
///
/// 1. `$XDG_CONFIG_HOME/input-intercept/` if the variable is set
/// 2. `~/.config/input-intercept/`
/// 3. The platform config directory (`dirs::config_dir`)
///
/// Each location is tried with `config.jsonc` then `config.json`.
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        roots.push(PathBuf::from(xdg_config));
    }
    if let Some(home) = dirs::home_dir() {
        roots.push(home.join(".config"));
    }
    if let Some(config_dir) = dirs::config_dir() {
        roots.push(config_dir);
    }

    let mut paths = Vec::new();
    for root in roots {
        let dir = root.join(CONFIG_DIR_NAME);
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths
}

/// Loads the configuration from a specific file.
///
/// The file may contain `//` and `/* */` comments.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if `path` does not exist,
/// `ConfigError::IoError` if it cannot be read and
/// `ConfigError::ParseError` if it is not valid JSON for [`EngineConfig`].
pub fn load_config_from_path(path: &Path) -> Result<(EngineConfig, PathBuf), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }

    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let config: EngineConfig = serde_json::from_reader(reader)?;
    Ok((config, path.to_path_buf()))
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists in any of
/// the expected locations, or the error from [`load_config_from_path`] for the
/// first file that does exist.
pub fn load_config() -> Result<(EngineConfig, PathBuf), ConfigError> {
    for path in config_paths() {
        if path.exists() {
            return load_config_from_path(&path);
        }
    }

    Err(ConfigError::NotFound)
}
