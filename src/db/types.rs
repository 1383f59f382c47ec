//! Statement outcome types.
//!
//! Defines the structures used to represent what the database returns for a
//! single submitted statement.

use crate::error::Result;
use futures::stream::BoxStream;
use std::fmt;

/// Lazy, forward-only stream of rows tied to a live connection.
///
/// The stream borrows the connection, so it must be dropped before the next
/// statement can be submitted.
pub type RowStream<'c> = BoxStream<'c, Result<Row>>;

/// The result of submitting one statement.
pub enum Outcome<'c> {
    /// The statement did not produce rows; carries the number of rows affected.
    /// Negative means the backend could not tell.
    UpdateCount(i64),

    /// The statement produced a result set.
    Rows {
        /// Column names, in result order.
        columns: Vec<String>,
        /// Rows, each aligned positionally with `columns`.
        rows: RowStream<'c>,
    },
}

impl fmt::Debug for Outcome<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::UpdateCount(n) => f.debug_tuple("UpdateCount").field(n).finish(),
            Outcome::Rows { columns, .. } => f
                .debug_struct("Rows")
                .field("columns", columns)
                .finish_non_exhaustive(),
        }
    }
}

/// A row of data from a result set.
pub type Row = Vec<Value>;

/// Represents a single value from a database row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    String(String),

    /// Binary data.
    Bytes(Vec<u8>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
