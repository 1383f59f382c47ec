//! Database gateway for the SQL runner.
//!
//! Provides a trait-based interface over a single database connection, so the
//! runner can drive PostgreSQL, SQLite, or a scripted mock interchangeably.

mod mock;
mod postgres;
mod sqlite;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient, MockLog, MockResponse};
pub use postgres::PostgresClient;
pub use sqlite::SqliteClient;
pub use types::{Outcome, Row, RowStream, Value};

use crate::config::ProfileConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses a backend from a driver identifier or url scheme.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// Resolves the profile's driver and opens one connection to it.
///
/// This is the central factory function for database connections.
pub async fn connect(profile: &ProfileConfig) -> Result<Box<dyn DatabaseClient>> {
    match profile.backend()? {
        DatabaseBackend::Postgres => {
            let client = PostgresClient::connect(profile).await?;
            Ok(Box::new(client))
        }
        DatabaseBackend::Sqlite => {
            let client = SqliteClient::connect(profile).await?;
            Ok(Box::new(client))
        }
    }
}

/// Trait defining the interface for a single-connection database client.
///
/// All database operations are async and return Results with SqlRunnerError.
/// Failures raised for one statement are reported as `SqlRunnerError::Query`.
#[async_trait]
pub trait DatabaseClient: Send {
    /// Returns the database product name and version, for display.
    async fn product_name(&mut self) -> Result<String>;

    /// Submits one statement and returns its outcome.
    ///
    /// A row-producing outcome borrows the client until its rows are dropped.
    async fn submit<'c>(&'c mut self, sql: &'c str) -> Result<Outcome<'c>>;

    /// Closes the connection.
    async fn close(self: Box<Self>) -> Result<()>;
}
