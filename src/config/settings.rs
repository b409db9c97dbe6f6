//! Application settings loaded from `stockroom.toml`
//!
//! Every field has a default, so a missing file or an empty section is valid.
//! `DATABASE_URL` in the environment overrides `[database] url`.

use crate::{
    core::audit::AuditPolicy,
    errors::{Error, Result},
};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Default settings file, relative to the working directory
pub const DEFAULT_SETTINGS_PATH: &str = "stockroom.toml";

const DEFAULT_DATABASE_URL: &str = "sqlite://data/stockroom.sqlite?mode=rwc";
const DEFAULT_LOG_FILTER: &str = "info";

/// Whole settings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `[database]`
    pub database: DatabaseSettings,
    /// `[audit]`
    pub audit: AuditPolicy,
    /// `[logging]`
    pub logging: LoggingSettings,
}

/// `[database]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Connection string handed to `sea_orm::Database::connect`
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Parses settings from TOML text.
///
/// # Errors
/// Returns `Config` if the TOML is malformed or a field has the wrong type.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse settings: {e}"),
    })
}

/// Loads settings from a TOML file.
///
/// # Errors
/// Returns `Config` if the file cannot be read or parsed.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read settings file: {e}"),
    })?;
    parse_settings(&contents)
}

/// Loads settings from [`DEFAULT_SETTINGS_PATH`] if present, otherwise the
/// defaults, then applies environment overrides.
///
/// # Errors
/// Returns `Config` if the file exists but cannot be parsed.
pub fn load_default_settings() -> Result<Settings> {
    let mut settings = if Path::new(DEFAULT_SETTINGS_PATH).exists() {
        load_settings(DEFAULT_SETTINGS_PATH)?
    } else {
        info!(
            path = DEFAULT_SETTINGS_PATH,
            "Settings: file not found, using defaults"
        );
        Settings::default()
    };
    settings.apply_env_overrides(std::env::var("DATABASE_URL").ok());
    Ok(settings)
}

impl Settings {
    /// Replaces the database url with `database_url` when one is given.
    pub fn apply_env_overrides(&mut self, database_url: Option<String>) {
        if let Some(url) = database_url.filter(|u| !u.trim().is_empty()) {
            self.database.url = url;
        }
    }
}
