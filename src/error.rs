//! Command Line Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The configuration could not be loaded.
    Config,
    /// The profile or annotation store could not be opened.
    Open,
    /// Scanning or reconciling the library failed.
    Refresh,
    /// A file's profile or annotation could not be read or written.
    Lookup,
    #[display("no readable file at {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Writing results to stdout failed.
    Output,
}
