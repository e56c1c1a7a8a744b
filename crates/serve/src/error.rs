//! Query Server Error Types

use derive_more::{Display, Error};

/// A server error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for server lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The listening socket could not be bound (port in use, no permission).
    #[display("could not listen on port {_0}")]
    Bind(#[error(not(source))] u16),
    /// The server task ended abnormally.
    #[display("query server failed")]
    Server,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Bind(_))
    }
}
