//! Statement extraction from script text.
//!
//! A script is read line by line. Blank lines and full-line comments (`#` or
//! `--`) are skipped, every other line is appended to the statement being
//! built, and a line ending in `;` completes it.
//!
//! A comment line that ends in `;` still terminates: it closes the statement
//! pending before it, without removing any of that statement's text, and is
//! skipped when nothing is pending. Bytes that are not valid UTF-8 are
//! replaced with U+FFFD rather than failing the read.

use crate::error::{Result, SqlRunnerError};
use std::fmt;
use std::io::BufRead;
use tracing::debug;

/// One logical statement, reassembled from its physical lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    text: String,
    line: usize,
}

impl Statement {
    /// Creates a statement whose first line is `line` (1-based).
    pub fn new(text: impl Into<String>, line: usize) -> Self {
        Self {
            text: text.into(),
            line,
        }
    }

    /// The SQL text, without the terminating `;` or surrounding whitespace.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Line of the script the statement started on.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Pulls statements one at a time out of a line-oriented reader.
pub struct StatementReader<R> {
    reader: R,
    pending: String,
    buf: Vec<u8>,
    line_number: usize,
}

impl<R: BufRead> StatementReader<R> {
    /// Wraps a reader positioned at the start of a script.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: String::new(),
            buf: Vec::new(),
            line_number: 0,
        }
    }

    /// Number of physical lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.line_number
    }

    /// Returns the next statement, or `None` once the script is exhausted.
    ///
    /// Text after the last terminator is discarded. Read failures are fatal
    /// and returned as `SqlRunnerError::Io`.
    pub fn next_statement(&mut self) -> Result<Option<Statement>> {
        self.pending.clear();
        let mut first_line = 0;

        loop {
            self.buf.clear();
            let read = self.reader.read_until(b'\n', &mut self.buf).map_err(|e| {
                SqlRunnerError::io(format!(
                    "Failed to read script at line {}: {e}",
                    self.line_number + 1
                ))
            })?;

            if read == 0 {
                if !self.pending.trim().is_empty() {
                    debug!(
                        "Discarding unterminated statement starting at line {}",
                        first_line
                    );
                }
                return Ok(None);
            }
            self.line_number += 1;

            let text = String::from_utf8_lossy(&self.buf);
            let line = strip_line_ending(&text);
            if line.is_empty() {
                continue;
            }

            let is_comment = line.starts_with('#') || line.starts_with("--");
            if !is_comment {
                if self.pending.is_empty() {
                    first_line = self.line_number;
                }
                self.pending.push(' ');
                self.pending.push_str(line);
            }

            if line.ends_with(';') {
                if is_comment {
                    // A terminated comment closes whatever came before it
                    if self.pending.is_empty() {
                        continue;
                    }
                } else {
                    self.pending.pop();
                }
                return Ok(Some(Statement::new(self.pending.trim(), first_line)));
            }
        }
    }
}

impl<R: BufRead> Iterator for StatementReader<R> {
    type Item = Result<Statement>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_statement().transpose()
    }
}

/// Strips a trailing `\n` or `\r\n`.
fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
