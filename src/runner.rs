//! Sequential script execution.
//!
//! `ScriptRunner` owns one database client for its whole life and feeds it
//! statements one at a time. A statement the database rejects is reported
//! and skipped; only stream and connection failures stop a run.

use crate::config::ProfileConfig;
use crate::db::{self, DatabaseClient};
use crate::error::{Result, SqlRunnerError};
use crate::present::present;
use crate::script::{Statement, StatementReader};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Counts for one completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Statements submitted to the database.
    pub executed: usize,

    /// Statements that failed.
    pub failed: usize,
}

impl RunSummary {
    /// Statements that completed without error.
    pub fn succeeded(&self) -> usize {
        self.executed - self.failed
    }
}

/// Runs scripts against a single database connection.
pub struct ScriptRunner {
    client: Box<dyn DatabaseClient>,
}

impl ScriptRunner {
    /// Resolves the profile's driver and connects.
    ///
    /// Fails with a connection error if the driver is unknown or the
    /// database cannot be reached.
    pub async fn open(profile: &ProfileConfig) -> Result<Self> {
        let backend = profile.backend()?;
        info!("Loading driver {}", backend.as_str());

        info!("Connecting to DB {}", profile.display_string());
        let client = db::connect(profile).await?;

        Ok(Self::with_client(client).await)
    }

    /// Wraps an already connected client, reporting what it is connected to.
    pub async fn with_client(mut client: Box<dyn DatabaseClient>) -> Self {
        match client.product_name().await {
            Ok(name) => info!("Connected to {name}"),
            Err(e) => warn!("Connected, but the database product is unknown: {e}"),
        }
        Self { client }
    }

    /// Runs the script at `path`, writing the transcript to `out`.
    pub async fn run_file<W: Write>(&mut self, path: &Path, out: &mut W) -> Result<RunSummary> {
        // Opened up front since a bad path is the most likely failure
        let file = File::open(path).map_err(|e| {
            SqlRunnerError::io(format!("Cannot open script {}: {e}", path.display()))
        })?;
        self.run(BufReader::new(file), out).await
    }

    /// Runs every statement in `script`, writing the transcript to `out`.
    ///
    /// Statement failures are written to `out` and counted; read and write
    /// failures abort the run.
    pub async fn run<R: BufRead, W: Write>(&mut self, script: R, out: &mut W) -> Result<RunSummary> {
        info!("SQLRunner: ready.");
        let mut summary = RunSummary::default();

        for statement in StatementReader::new(script) {
            let statement = statement?;
            summary.executed += 1;
            if !self.run_statement(&statement, out).await? {
                summary.failed += 1;
            }
        }

        Ok(summary)
    }

    /// Submits one statement and renders its outcome.
    ///
    /// Returns `Ok(false)` if the database rejected the statement or its rows
    /// could not be read; the error has already been written to `out`.
    pub async fn run_statement<W: Write>(
        &mut self,
        statement: &Statement,
        out: &mut W,
    ) -> Result<bool> {
        writeln!(out, "Executing : <<{statement}>>")?;
        out.flush()?;

        let start = Instant::now();
        let result = match self.client.submit(statement.as_str()).await {
            Ok(outcome) => present(outcome, out).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                debug!(line = statement.line(), elapsed = ?start.elapsed(), "Statement done");
                Ok(true)
            }
            Err(e) if !e.is_fatal() => {
                warn!(line = statement.line(), "Statement failed: {statement}: {e}");
                writeln!(out, "ERROR: {e}")?;
                writeln!(out)?;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Releases the connection.
    pub async fn close(self) -> Result<()> {
        debug!("Closing connection");
        self.client.close().await
    }
}
