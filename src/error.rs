use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("file store error")]
    Store,
    #[display("database inspection error")]
    Inspect,
    #[display("query server error")]
    Serve,
    #[display("could not write {}", _0.display())]
    Output(#[error(not(source))] PathBuf),
    #[display("{_0}")]
    Usage(#[error(not(source))] String),
}
