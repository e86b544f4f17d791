//! Configuration module.
//!
//! Handles store location, environment variables, and settings.

mod connection;
mod settings;

pub use connection::{ConnectionError, StoreConfig, DEFAULT_DATABASE};
pub use settings::{expand_env_vars, Settings, SettingsError, StoreSettings};
