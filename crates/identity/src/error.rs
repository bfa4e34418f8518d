//! Identity Error Types
//!
//! Kinds are `Clone` because a single failed fingerprint computation is
//! reported to every caller that was waiting on it.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An identity cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for identity cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Clone, Display, Error)]
pub enum ErrorKind {
    /// The profile store could not be opened.
    #[display("cannot open profile store")]
    Store,
    /// The file exists but its fingerprint could not be computed.
    #[display("cannot fingerprint {}", _0.display())]
    Fingerprint(#[error(not(source))] PathBuf),
    /// The profile for this file could not be written or removed.
    #[display("cannot persist profile for {}", _0.display())]
    Persist(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fingerprint(_) | Self::Persist(_))
    }
}
