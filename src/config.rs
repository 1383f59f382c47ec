//! Configuration management for the SQL runner.
//!
//! Profiles are loaded from a TOML file, keyed by name. Each profile carries
//! the four connection values: driver, url, user and password.

use crate::db::DatabaseBackend;
use crate::error::{Result, SqlRunnerError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Profile used when none is named on the command line.
pub const DEFAULT_PROFILE: &str = "default";

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Named connection profiles.
    #[serde(default)]
    pub profiles: HashMap<String, ProfileConfig>,
}

/// Connection values for one profile.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct ProfileConfig {
    /// Driver identifier ("postgres", "postgresql" or "sqlite").
    pub driver: Option<String>,

    /// Connection URL, e.g. `postgres://host:5432/db` or `sqlite:data.db`.
    pub url: Option<String>,

    /// Database user.
    pub user: Option<String>,

    /// Database password (not recommended to store in config).
    pub password: Option<String>,
}

impl ProfileConfig {
    /// Creates a profile from a driver and url.
    pub fn new(driver: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            driver: Some(driver.into()),
            url: Some(url.into()),
            user: None,
            password: None,
        }
    }

    /// Sets the credentials.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Merges another profile into this one, with the other taking precedence.
    pub fn merge(&mut self, other: &ProfileConfig) {
        if other.driver.is_some() {
            self.driver = other.driver.clone();
        }
        if other.url.is_some() {
            self.url = other.url.clone();
        }
        if other.user.is_some() {
            self.user = other.user.clone();
        }
        if other.password.is_some() {
            self.password = other.password.clone();
        }
    }

    /// Applies `SQLRUNNER_*` environment variables as defaults.
    pub fn apply_env_defaults(&mut self) {
        if self.driver.is_none() {
            self.driver = std::env::var("SQLRUNNER_DRIVER").ok();
        }
        if self.url.is_none() {
            self.url = std::env::var("SQLRUNNER_URL").ok();
        }
        if self.user.is_none() {
            self.user = std::env::var("SQLRUNNER_USER").ok();
        }
        if self.password.is_none() {
            self.password = std::env::var("SQLRUNNER_PASSWORD").ok();
        }
    }

    /// Returns the connection url, which every profile must have.
    pub fn url(&self) -> Result<&str> {
        self.url
            .as_deref()
            .ok_or_else(|| SqlRunnerError::config("Connection url is required"))
    }

    /// Resolves the database backend for this profile.
    ///
    /// An explicit driver must name a known backend; without one, the backend
    /// is inferred from the url scheme.
    pub fn backend(&self) -> Result<DatabaseBackend> {
        if let Some(driver) = &self.driver {
            return DatabaseBackend::parse(driver)
                .ok_or_else(|| SqlRunnerError::connection(format!("Unknown driver '{driver}'")));
        }

        let url = self.url()?;
        let scheme = url.split(':').next().unwrap_or_default();
        DatabaseBackend::parse(scheme).ok_or_else(|| {
            SqlRunnerError::config(format!(
                "No driver configured and none can be inferred from '{scheme}'"
            ))
        })
    }

    /// Returns a display-safe form of the url (password removed).
    pub fn display_string(&self) -> String {
        let Some(raw) = self.url.as_deref() else {
            return "<no url>".to_string();
        };

        match Url::parse(raw) {
            Ok(mut url) if url.password().is_some() => {
                let _ = url.set_password(Some("****"));
                url.to_string()
            }
            _ => raw.to_string(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sql-runner")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields an empty configuration.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| SqlRunnerError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            SqlRunnerError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Gets a named profile, or the default profile if name is None.
    pub fn get_profile(&self, name: Option<&str>) -> Option<&ProfileConfig> {
        let key = name.unwrap_or(DEFAULT_PROFILE);
        self.profiles.get(key)
    }
}
