//! Inspector Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An inspector error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for inspector operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The file is missing, unreadable, locked, or not a SQLite database.
    #[display("storage unavailable: {}", _0.display())]
    StorageUnavailable(#[error(not(source))] PathBuf),
    /// No database has been opened yet (or it was closed).
    #[display("no database is open")]
    NotOpen,
    /// Writes were attempted against a view, or a table without a rowid.
    #[display("read-only target: {_0}")]
    ReadOnlyTarget(#[error(not(source))] String),
    /// An identifier that was not discovered by introspection, or a table
    /// kind that does not match what was discovered.
    #[display("unknown identifier: {_0}")]
    Validation(#[error(not(source))] String),
    /// A statement failed (constraint violation, type mismatch, I/O). The
    /// transaction has been rolled back.
    #[display("storage error")]
    Storage,
    /// A single-row lookup statement was rejected by SQLite; carries its
    /// message.
    #[display("{_0}")]
    Query(#[error(not(source))] String),
    /// A value could not be converted to the requested type.
    #[display("invalid value: {_0}")]
    InvalidValue(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_) | Self::Storage)
    }
}
