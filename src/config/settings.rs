//! TOML-based configuration.
//!
//! Supports a config file (squall.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [store]
//! data_dir = "${SQUALL_HOME}/data"
//! database = "local_rs"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::connection::StoreConfig;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Store location.
    #[serde(default)]
    pub store: StoreSettings,
}

/// Store configuration section.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Directory of collection files (supports ${ENV_VAR} expansion).
    pub data_dir: Option<String>,

    /// Logical database label.
    pub database: Option<String>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `SQUALL_CONFIG`
    /// 2. `./squall.toml`
    /// 3. `~/.config/squall/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("SQUALL_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("squall.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("squall").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // No config file anywhere is fine; flags and env still apply.
        Ok(Settings::default())
    }

    /// Store config from the `[store]` section, env vars expanded.
    /// `None` when the file names no data directory.
    pub fn store_config(&self) -> Result<Option<StoreConfig>, SettingsError> {
        let data_dir = match &self.store.data_dir {
            Some(raw) => expand_env_vars(raw)?,
            None => return Ok(None),
        };
        Ok(Some(StoreConfig {
            data_dir: PathBuf::from(data_dir),
            database: self.store.database.clone(),
        }))
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' {
            if chars.peek() == Some(&'{') {
                chars.next(); // consume '{'
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch == '}' {
                        chars.next(); // consume '}'
                        break;
                    }
                    var_name.push(ch);
                    chars.next();
                }
                let value = env::var(&var_name)
                    .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                result.push_str(&value);
            } else {
                // $VAR ends at the first non-alphanumeric, non-underscore
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        var_name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if var_name.is_empty() {
                    // A lone $ stays as-is.
                    result.push('$');
                } else {
                    let value = env::var(&var_name)
                        .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                    result.push_str(&value);
                }
            }
        } else {
            result.push(c);
        }
    }

    Ok(result)
}
