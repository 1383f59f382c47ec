//! Mock database clients for testing.
//!
//! `MockDatabaseClient` answers from a table of scripted responses and records
//! every statement it receives; `FailingDatabaseClient` rejects everything.

use super::{DatabaseClient, Outcome, Row, Value};
use crate::error::{Result, SqlRunnerError};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A scripted response for one statement text.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// A result set.
    Rows { columns: Vec<String>, rows: Vec<Row> },

    /// A result set whose stream fails after yielding `rows`.
    BrokenRows {
        columns: Vec<String>,
        rows: Vec<Row>,
        error: String,
    },

    /// An update count.
    Count(i64),

    /// A database error.
    Error(String),
}

impl MockResponse {
    /// Builds a result set from string cells.
    pub fn rows(columns: &[&str], rows: &[&[&str]]) -> Self {
        Self::Rows {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| Value::from(*cell)).collect())
                .collect(),
        }
    }
}

/// Shared record of what a mock client saw, readable after the client has
/// been handed to a runner.
#[derive(Debug, Clone, Default)]
pub struct MockLog {
    inner: Arc<Mutex<MockLogState>>,
}

#[derive(Debug, Default)]
struct MockLogState {
    submitted: Vec<String>,
    closed: usize,
}

impl MockLog {
    /// Statements submitted so far, in order.
    pub fn submitted(&self) -> Vec<String> {
        self.lock().submitted.clone()
    }

    /// Number of times the client was closed.
    pub fn close_count(&self) -> usize {
        self.lock().closed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockLogState> {
        // A panicking test thread must not hide the log from the others
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A mock database client that returns predefined results.
///
/// Statements without a scripted response behave like a permissive
/// database: `SELECT`s return one row echoing the statement, empty
/// statements fail, everything else reports zero rows affected.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    responses: HashMap<String, MockResponse>,
    log: MockLog,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the response for an exact statement text.
    pub fn on(mut self, sql: impl Into<String>, response: MockResponse) -> Self {
        self.responses.insert(sql.into(), response);
        self
    }

    /// Returns a handle to this client's log.
    pub fn log(&self) -> MockLog {
        self.log.clone()
    }

    fn default_response(sql: &str) -> MockResponse {
        if sql.is_empty() {
            MockResponse::Error("syntax error: empty statement".to_string())
        } else if sql.to_uppercase().starts_with("SELECT") {
            MockResponse::Rows {
                columns: vec!["result".to_string()],
                rows: vec![vec![Value::String(format!("Mock result for: {sql}"))]],
            }
        } else {
            MockResponse::Count(0)
        }
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn product_name(&mut self) -> Result<String> {
        Ok("MockDB".to_string())
    }

    async fn submit<'c>(&'c mut self, sql: &'c str) -> Result<Outcome<'c>> {
        self.log.lock().submitted.push(sql.to_string());

        let response = self
            .responses
            .get(sql)
            .cloned()
            .unwrap_or_else(|| Self::default_response(sql));

        match response {
            MockResponse::Rows { columns, rows } => Ok(Outcome::Rows {
                columns,
                rows: stream::iter(rows.into_iter().map(Ok)).boxed(),
            }),
            MockResponse::BrokenRows {
                columns,
                rows,
                error,
            } => {
                let items = rows
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(SqlRunnerError::query(error))));
                Ok(Outcome::Rows {
                    columns,
                    rows: stream::iter(items).boxed(),
                })
            }
            MockResponse::Count(n) => Ok(Outcome::UpdateCount(n)),
            MockResponse::Error(msg) => Err(SqlRunnerError::query(msg)),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.log.lock().closed += 1;
        Ok(())
    }
}

/// A database client whose every statement fails.
#[derive(Debug, Default)]
pub struct FailingDatabaseClient {
    log: MockLog,
}

impl FailingDatabaseClient {
    /// Creates a new failing client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to this client's log.
    pub fn log(&self) -> MockLog {
        self.log.clone()
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn product_name(&mut self) -> Result<String> {
        Err(SqlRunnerError::query("metadata unavailable"))
    }

    async fn submit<'c>(&'c mut self, sql: &'c str) -> Result<Outcome<'c>> {
        self.log.lock().submitted.push(sql.to_string());
        Err(SqlRunnerError::query(format!("cannot execute: {sql}")))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.log.lock().closed += 1;
        Ok(())
    }
}
