//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient`
//! trait over a single dedicated sqlx connection.
//!
//! Statements go over the simple query protocol, so every value arrives as
//! text and any column type can be rendered. Each statement is first prepared
//! to learn its result columns; text holding several commands cannot be
//! prepared, so it runs unprepared and reports only its update count.

use crate::config::ProfileConfig;
use crate::db::{DatabaseClient, Outcome, Row, RowStream, Value};
use crate::error::{Result, SqlRunnerError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{
    Column as SqlxColumn, ConnectOptions, Connection, Decode, Executor, Postgres, Row as SqlxRow,
    Statement as SqlxStatement, TypeInfo, ValueRef,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// PostgreSQL database client.
#[derive(Debug)]
pub struct PostgresClient {
    conn: PgConnection,
}

impl PostgresClient {
    /// Opens a connection for the given profile.
    ///
    /// Transient failures (refused, timed out) are retried with exponential
    /// backoff; anything else fails immediately.
    pub async fn connect(profile: &ProfileConfig) -> Result<Self> {
        let url = profile.url()?;
        let mut options = PgConnectOptions::from_str(url)
            .map_err(|e| SqlRunnerError::connection(format!("Invalid PostgreSQL url: {e}")))?;
        if let Some(user) = &profile.user {
            options = options.username(user);
        }
        if let Some(password) = &profile.password {
            options = options.password(password);
        }

        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
        let mut attempt = 1;

        loop {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            match options.connect().await {
                Ok(conn) => {
                    debug!("Successfully connected to database");
                    return Ok(Self { conn });
                }
                Err(e) if attempt < MAX_RETRY_ATTEMPTS && is_transient_error(&e) => {
                    warn!(
                        "Connection attempt {} failed (transient error), retrying in {:?}",
                        attempt, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(map_connection_error(e, &options)),
            }
        }
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn product_name(&mut self) -> Result<String> {
        sqlx::query_scalar::<_, String>("SELECT version()")
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| SqlRunnerError::query(format_query_error(e)))
    }

    async fn submit<'c>(&'c mut self, sql: &'c str) -> Result<Outcome<'c>> {
        let columns = match column_names(&mut self.conn, sql).await {
            Ok(columns) => columns,
            Err(e) => {
                debug!("Cannot prepare statement, running it unprepared: {e}");
                return execute(&mut self.conn, sql).await.map_err(|_| e);
            }
        };

        if columns.is_empty() {
            return execute(&mut self.conn, sql).await;
        }

        Ok(Outcome::Rows {
            columns,
            rows: row_stream(&mut self.conn, sql),
        })
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| SqlRunnerError::connection(format!("Failed to close connection: {e}")))
    }
}

/// Prepares `sql` and returns the names of the columns it would produce.
fn column_names<'c>(
    conn: &'c mut PgConnection,
    sql: &'c str,
) -> BoxFuture<'c, Result<Vec<String>>> {
    conn.prepare(sql)
        .map(|prepared| -> Result<Vec<String>> {
            let statement = prepared.map_err(|e| SqlRunnerError::query(format_query_error(e)))?;
            Ok(statement
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect())
        })
        .boxed()
}

/// Streams the rows `sql` produces, decoding each as it arrives.
fn row_stream<'c>(conn: &'c mut PgConnection, sql: &'c str) -> RowStream<'c> {
    conn.fetch(sql)
        .map(|row| {
            row.map_err(|e| SqlRunnerError::query(format_query_error(e)))
                .and_then(|row| convert_row(&row))
        })
        .boxed()
}

/// Runs `sql` to completion and reports the rows it affected.
fn execute<'c>(
    conn: &'c mut PgConnection,
    sql: &'c str,
) -> BoxFuture<'c, Result<Outcome<'c>>> {
    conn.execute(sql)
        .map(|done| {
            done.map(|done| Outcome::UpdateCount(done.rows_affected() as i64))
                .map_err(|e| SqlRunnerError::query(format_query_error(e)))
        })
        .boxed()
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Result<Row> {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize) -> Result<Value> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| SqlRunnerError::query(format!("Cannot read column {index}: {e}")))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let type_name = raw.type_info().name().to_uppercase();
    let decoded = match type_name.as_str() {
        "BOOL" | "BOOLEAN" => <bool as Decode<'_, Postgres>>::decode(raw).map(Value::Bool),
        "INT2" | "SMALLINT" => {
            <i16 as Decode<'_, Postgres>>::decode(raw).map(|v| Value::Int(v as i64))
        }
        "INT4" | "INT" | "INTEGER" => {
            <i32 as Decode<'_, Postgres>>::decode(raw).map(|v| Value::Int(v as i64))
        }
        "INT8" | "BIGINT" => <i64 as Decode<'_, Postgres>>::decode(raw).map(Value::Int),
        "FLOAT4" | "REAL" => {
            <f32 as Decode<'_, Postgres>>::decode(raw).map(|v| Value::Float(v as f64))
        }
        "FLOAT8" | "DOUBLE PRECISION" => {
            <f64 as Decode<'_, Postgres>>::decode(raw).map(Value::Float)
        }
        "BYTEA" => <Vec<u8> as Decode<'_, Postgres>>::decode(raw).map(Value::Bytes),
        // Everything else keeps the server's text rendering
        _ => <String as Decode<'_, Postgres>>::decode(raw).map(Value::String),
    };

    decoded.map_err(|e| {
        SqlRunnerError::query(format!(
            "Cannot render column {index} of type {type_name}: {e}"
        ))
    })
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("timeout")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
    {
        return true;
    }

    // Authentication, missing database and TLS problems never fix themselves
    false
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, options: &PgConnectOptions) -> SqlRunnerError {
    let host = options.get_host();
    let port = options.get_port();
    let user = options.get_username();
    let database = options.get_database().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        SqlRunnerError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        SqlRunnerError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        SqlRunnerError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        SqlRunnerError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        SqlRunnerError::connection(error.to_string())
    }
}

/// Formats a query error with PostgreSQL detail and hint lines if available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::new();
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }

        if let Some(constraint) = pg_error.constraint() {
            result.push_str("\n  CONSTRAINT: ");
            result.push_str(constraint);
        }
    }

    result
}
