//! Plain-text rendering of statement outcomes.
//!
//! Result sets print as a header line and one line per row, every field
//! followed by a tab. Update counts print as `OK: <n>`. Each outcome ends
//! with a blank line.

use crate::db::Outcome;
use crate::error::Result;
use futures::StreamExt;
use std::io::Write;

/// Field separator, written after every column name and cell.
pub const FIELD_SEPARATOR: char = '\t';

/// Renders one outcome to `out`, consuming its rows.
///
/// Returns a `Query` error if a row cannot be fetched or decoded, and an
/// `Io` error if `out` cannot be written.
pub async fn present<W: Write>(outcome: Outcome<'_>, out: &mut W) -> Result<()> {
    match outcome {
        Outcome::UpdateCount(count) => {
            writeln!(out, "OK: {count}")?;
        }
        Outcome::Rows { columns, mut rows } => {
            for column in &columns {
                write!(out, "{column}{FIELD_SEPARATOR}")?;
            }
            writeln!(out)?;

            while let Some(row) = rows.next().await {
                for cell in row? {
                    write!(out, "{cell}{FIELD_SEPARATOR}")?;
                }
                writeln!(out)?;
            }
        }
    }

    writeln!(out)?;
    Ok(())
}
