//! sql-runner - run SQL scripts statement by statement.
//!
//! A script is split into statements by `script`, each statement is submitted
//! through a `db::DatabaseClient` by `runner`, and outcomes are rendered as
//! tab-separated text by `present`.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod present;
pub mod runner;
pub mod script;
