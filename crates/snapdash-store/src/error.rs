//! Store Error Types
//!
//! Every store operation returns `Result<T>`, aliased to
//! `Result<T, StoreError>`, so database and migration failures propagate
//! with `?`.
//!
//! ## Error Categories
//!
//! - `Database`: the underlying SQL driver failed (connection, query, decode)
//! - `Query`: a statement could not be assembled (column/value count mismatch)
//! - `Migration`: the embedded schema could not be applied
//! - `Timeout`: a storage call exceeded the configured query timeout
//! - `InvalidDrillLevel`: a drill-down was requested from an unsupported parent level
//! - `UnknownColumn`: an ingested record named a column the report does not have
//! - `InvalidDate` / `Decode`: stored values could not be mapped back to Rust types

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Query build error: {0}")]
    Query(#[from] sea_query::error::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid drill level: {0}")]
    InvalidDrillLevel(String),

    #[error("Unknown column {column} for report {report}")]
    UnknownColumn { report: &'static str, column: String },

    #[error("Invalid snapshot date: {0}")]
    InvalidDate(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether the error was caused by caller input rather than the storage layer
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidDrillLevel(_) | StoreError::UnknownColumn { .. }
        )
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(e.to_string())
    }
}

impl From<chrono::ParseError> for StoreError {
    fn from(e: chrono::ParseError) -> Self {
        StoreError::InvalidDate(e.to_string())
    }
}
