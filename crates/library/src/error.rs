//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a library failure.
///
/// ### Operational Errors
/// - [`ErrorKind::Walk`]
/// - [`ErrorKind::InvalidRotation`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Metadata`]
/// - [`ErrorKind::Identity`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A directory or file below a library root could not be read.
    #[display("cannot read {}", _0.display())]
    Walk(#[error(not(source))] PathBuf),
    /// The metadata table could not be opened, read or written.
    Metadata,
    /// A file's identity could not be resolved via [`reel_identity::IdentityCache`].
    Identity,
    /// Rotations are quarter turns only.
    #[display("invalid rotation: {_0} (expected 0, 90, 180 or 270)")]
    InvalidRotation(#[error(not(source))] u16),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Walk(_) | Self::Metadata | Self::Identity)
    }
}
