//! Configuration for the interception engine.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

pub mod types;

use std::path::PathBuf;
use std::sync::OnceLock;

pub use types::{
    CallSiteConfig, ConfigError, DEFAULT_INPUT_SIGNATURE, DEFAULT_KEY_MESSAGE_SIGNATURE,
    EngineConfig, INPUT_SITE, KEY_MESSAGE_SITE, config_paths, load_config as load_config_default,
    load_config_from_path,
};

/// Global configuration instance, loaded once at startup.
static CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Path to the currently loaded configuration file.
static CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Custom config path override (set via CLI --config flag).
static CUSTOM_CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Sets a custom configuration file path to use instead of the default search paths.
///
/// Must be called before `init()` or `get_config()` to take effect.
/// Returns `false` if a path was already set.
pub fn set_custom_config_path(path: PathBuf) -> bool { CUSTOM_CONFIG_PATH.set(path).is_ok() }

/// Loads the configuration from disk, falling back to defaults.
fn load_or_default() -> EngineConfig {
    let result = match CUSTOM_CONFIG_PATH.get() {
        Some(path) => load_config_from_path(path),
        None => load_config_default(),
    };

    match result {
        Ok((config, path)) => {
            let _ = CONFIG_PATH.set(path);
            config
        }
        Err(ConfigError::NotFound) => {
            tracing::debug!("config: no configuration file found, using defaults");
            EngineConfig::default()
        }
        Err(err) => {
            tracing::warn!(error = %err, "config: failed to load configuration, using defaults");
            EngineConfig::default()
        }
    }
}

/// Initializes and returns the global configuration instance.
///
/// Idempotent: later calls return the same instance.
pub fn init() -> &'static EngineConfig { CONFIG.get_or_init(load_or_default) }

/// Returns the global configuration instance, initializing it if necessary.
pub fn get_config() -> &'static EngineConfig { CONFIG.get_or_init(load_or_default) }

/// Returns the path to the loaded configuration file, if any.
pub fn get_config_path() -> Option<&'static PathBuf> { CONFIG_PATH.get() }
