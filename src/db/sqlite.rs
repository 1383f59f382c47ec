//! SQLite database client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient`
//! trait over a single sqlx SQLite connection.
//!
//! Each statement is prepared first to learn its result columns. Text holding
//! several commands cannot always be prepared up front (a later command may
//! name a table an earlier one creates), so it runs unprepared and reports
//! only its update count.

use crate::config::ProfileConfig;
use crate::db::{DatabaseClient, Outcome, Row, RowStream, Value};
use crate::error::{Result, SqlRunnerError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{
    Column as SqlxColumn, ConnectOptions, Connection, Decode, Executor, Row as SqlxRow, Sqlite,
    Statement as SqlxStatement, TypeInfo, ValueRef,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// SQLite database client.
#[derive(Debug)]
pub struct SqliteClient {
    conn: SqliteConnection,
}

impl SqliteClient {
    /// Opens (creating if needed) the database named by the profile url.
    ///
    /// SQLite has no accounts, so user and password are ignored.
    pub async fn connect(profile: &ProfileConfig) -> Result<Self> {
        let url = profile.url()?;
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| SqlRunnerError::connection(format!("Invalid SQLite url: {e}")))?
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        if profile.user.is_some() || profile.password.is_some() {
            debug!("Ignoring credentials for SQLite connection");
        }

        let conn = options.connect().await.map_err(|e| {
            SqlRunnerError::connection(format!("Cannot open SQLite database {url}: {e}"))
        })?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn product_name(&mut self) -> Result<String> {
        let version = sqlx::query_scalar::<_, String>("SELECT sqlite_version()")
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| SqlRunnerError::query(e.to_string()))?;
        Ok(format!("SQLite {version}"))
    }

    async fn submit<'c>(&'c mut self, sql: &'c str) -> Result<Outcome<'c>> {
        let columns = match column_names(&mut self.conn, sql).await {
            Ok(columns) => columns,
            Err(e) => {
                debug!("Cannot prepare statement, running it unprepared: {e}");
                return execute_counted(&mut self.conn, sql).await.map_err(|_| e);
            }
        };

        if columns.is_empty() {
            return execute_counted(&mut self.conn, sql).await;
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
    conn: &'c mut SqliteConnection,
    sql: &'c str,
) -> BoxFuture<'c, Result<Vec<String>>> {
    conn.prepare(sql)
        .map(|prepared| -> Result<Vec<String>> {
            let statement = prepared.map_err(|e| SqlRunnerError::query(e.to_string()))?;
            Ok(statement
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect())
        })
        .boxed()
}

/// Streams the rows `sql` produces, decoding each as it arrives.
fn row_stream<'c>(conn: &'c mut SqliteConnection, sql: &'c str) -> RowStream<'c> {
    conn.fetch(sql)
        .map(|row| {
            row.map_err(|e| SqlRunnerError::query(e.to_string()))
                .and_then(|row| convert_row(&row))
        })
        .boxed()
}

/// Runs `sql` to completion, discarding any rows.
fn execute<'c>(conn: &'c mut SqliteConnection, sql: &'c str) -> BoxFuture<'c, Result<()>> {
    conn.execute(sql)
        .map(|done| {
            done.map(|_| ())
                .map_err(|e| SqlRunnerError::query(e.to_string()))
        })
        .boxed()
}

/// Rows changed since the connection opened.
fn total_changes(conn: &mut SqliteConnection) -> BoxFuture<'_, Result<i64>> {
    conn.fetch_one("SELECT total_changes()")
        .map(|row| {
            row.and_then(|row| row.try_get::<i64, _>(0))
                .map_err(|e| SqlRunnerError::query(e.to_string()))
        })
        .boxed()
}

/// Runs `sql` and reports how many rows it changed.
///
/// `changes()` is not reset by DDL, so the count is taken as the difference
/// in `total_changes()` across the statement. Rows changed by triggers are
/// included.
async fn execute_counted(conn: &mut SqliteConnection, sql: &str) -> Result<Outcome<'static>> {
    let before = total_changes(conn).await?;
    execute(conn, sql).await?;
    let after = total_changes(conn).await?;
    Ok(Outcome::UpdateCount(after - before))
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Result<Row> {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Converts a single value, going by its storage class rather than the
/// declared column type.
fn convert_value(row: &SqliteRow, index: usize) -> Result<Value> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| SqlRunnerError::query(format!("Cannot read column {index}: {e}")))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let type_name = raw.type_info().name().to_uppercase();
    let decoded = match type_name.as_str() {
        "INTEGER" => <i64 as Decode<'_, Sqlite>>::decode(raw).map(Value::Int),
        "REAL" => <f64 as Decode<'_, Sqlite>>::decode(raw).map(Value::Float),
        "BOOLEAN" => <bool as Decode<'_, Sqlite>>::decode(raw).map(Value::Bool),
        "BLOB" => <Vec<u8> as Decode<'_, Sqlite>>::decode(raw).map(Value::Bytes),
        _ => <String as Decode<'_, Sqlite>>::decode(raw).map(Value::String),
    };

    decoded.map_err(|e| {
        SqlRunnerError::query(format!(
            "Cannot render column {index} of type {type_name}: {e}"
        ))
    })
}
