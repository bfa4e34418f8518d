//! Store Error Types

use crate::ShardId;
use derive_more::{Display, Error};
use std::path::PathBuf;

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The store directory could not be created.
    #[display("cannot prepare store directory: {}", _0.display())]
    Directory(#[error(not(source))] PathBuf),
    /// A shard exists on disk but could not be read (corrupt content is not an error).
    #[display("cannot read shard {_0}")]
    Load(#[error(not(source))] ShardId),
    /// A shard could not be written; the in-memory change was rolled back.
    #[display("cannot persist shard {_0}")]
    Persist(#[error(not(source))] ShardId),
    /// A value could not be serialized.
    #[display("cannot encode shard {_0}")]
    Encode(#[error(not(source))] ShardId),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Directory(_) | Self::Load(_) | Self::Persist(_))
    }
}
