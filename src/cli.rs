//! Command-line argument parsing for the SQL runner.
//!
//! Uses clap to select a configuration profile and the script to run.

use crate::config::{Config, ProfileConfig};
use clap::Parser;
use std::path::PathBuf;

/// Run a SQL script against a database, one statement at a time.
#[derive(Parser, Debug)]
#[command(name = "sqlrunner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Script to run; reads standard input when absent or "-"
    #[arg(value_name = "SCRIPT")]
    pub script: Option<PathBuf>,

    /// Configuration profile to use
    #[arg(short = 'c', long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Database driver (postgres or sqlite), overriding the profile
    #[arg(long, value_name = "DRIVER")]
    pub driver: Option<String>,

    /// Connection url, overriding the profile
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Database user, overriding the profile
    #[arg(short = 'U', long, value_name = "USER")]
    pub user: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Returns the named profile to use, if specified.
    pub fn profile_name(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Returns the script path, or None to read standard input.
    pub fn script_path(&self) -> Option<&PathBuf> {
        self.script
            .as_ref()
            .filter(|path| path.as_os_str() != "-")
    }

    /// Connection values given directly on the command line.
    ///
    /// Password is never accepted as an argument.
    pub fn profile_overrides(&self) -> ProfileConfig {
        ProfileConfig {
            driver: self.driver.clone(),
            url: self.url.clone(),
            user: self.user.clone(),
            password: None,
        }
    }
}
