//! Configuration Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    Missing(#[error(not(source))] PathBuf),
    /// A source could not be parsed or a value has the wrong type.
    #[display("could not load configuration: {_0}")]
    Load(#[error(not(source))] String),
    /// Values parsed but are out of range.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
}
