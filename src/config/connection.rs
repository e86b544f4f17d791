//! Store location configuration.
//!
//! Supports configuration via environment variables:
//! - `SQUALL_DATA_DIR`: Directory holding collection files
//! - `SQUALL_DATABASE`: Logical database label used in logs (optional)

use std::env;
use std::path::PathBuf;

/// Label used when no database name is configured. Matches the database the
/// archived forecast dumps were taken from.
pub const DEFAULT_DATABASE: &str = "local_rs";

/// Error type for store configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Where to load collections from.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory of collection files.
    pub data_dir: PathBuf,
    /// Logical database label; cosmetic, shows up in logs only.
    pub database: Option<String>,
}

impl StoreConfig {
    /// Config pointing at a directory, with the default database label.
    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            database: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `SQUALL_DATA_DIR`: Directory holding collection files
    ///
    /// Optional:
    /// - `SQUALL_DATABASE`: Logical database label
    pub fn from_env() -> Result<Self, ConnectionError> {
        let data_dir = env::var("SQUALL_DATA_DIR")
            .map_err(|_| ConnectionError::MissingEnvVar("SQUALL_DATA_DIR".to_string()))?;
        if data_dir.trim().is_empty() {
            return Err(ConnectionError::InvalidConfig(
                "SQUALL_DATA_DIR is set but empty".to_string(),
            ));
        }

        let database = env::var("SQUALL_DATABASE").ok();

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            database,
        })
    }

    /// Database label for logs.
    pub fn database_label(&self) -> &str {
        self.database.as_deref().unwrap_or(DEFAULT_DATABASE)
    }
}
