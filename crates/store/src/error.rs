//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The database file could not be opened or created (missing directory,
    /// permissions, locked, or not a SQLite database).
    #[display("storage unavailable: {}", _0.display())]
    StorageUnavailable(#[error(not(source))] PathBuf),
    #[display("database error")]
    Database,
    #[display("file not found: {_0}")]
    NotFound(#[error(not(source))] i64),
    /// The insert transaction failed and was rolled back.
    #[display("failed to insert file: {_0}")]
    InsertFailed(#[error(not(source))] String),
    /// Serialization/deserialization error.
    #[display("invalid store data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
    #[display("could not read file: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_) | Self::Database)
    }
}
