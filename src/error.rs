//! Error types for the SQL runner.
//!
//! Errors fall into two tiers: statement-level errors (`Query`) which are
//! reported and skipped, and everything else, which aborts the run.

use thiserror::Error;

/// Main error type for runner operations.
#[derive(Error, Debug)]
pub enum SqlRunnerError {
    /// Driver resolution or connection establishment errors.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Errors raised by the database for a single statement, including
    /// failures while reading its result rows.
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration errors (unreadable config file, missing driver or url, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading the script or writing the transcript failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl SqlRunnerError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an I/O error with the given message.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Config(_) => "Configuration Error",
            Self::Io(_) => "I/O Error",
        }
    }

    /// Returns true if this error must abort the whole run.
    ///
    /// Only query errors are isolated to the statement that raised them.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Query(_))
    }
}

impl From<std::io::Error> for SqlRunnerError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Result type alias using SqlRunnerError.
pub type Result<T> = std::result::Result<T, SqlRunnerError>;
