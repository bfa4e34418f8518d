//! Fast, size-aware content fingerprints.
//!
//! Hashing a multi-gigabyte video in full during a library scan is not an
//! option, so this crate samples instead: small files are read in full, large
//! files contribute three 2 KiB blocks (head, middle, tail). The sample is
//! hashed with 64-bit FNV-1a and the file size is folded in afterwards so
//! that two files whose samples happen to match but whose lengths differ
//! still get different fingerprints.
//!
//! **This is not a cryptographic hash.** It is a cheap identity that is good
//! enough to recognise the same file after a rename or move inside a personal
//! media library. Two files that only differ outside the sampled regions will
//! collide, and that is accepted.
//!
//! ```no_run
//! # async fn example() -> reel_fingerprint::error::Result<()> {
//! let fingerprint = reel_fingerprint::fingerprint("/media/films/big-buck-bunny.mkv").await?;
//! println!("{fingerprint}"); // e.g. "a8c7f832281a39c5"
//! # Ok(())
//! # }
//! ```

pub mod error;
mod fnv;
mod model;
mod sample;

pub use crate::model::Fingerprint;
pub use crate::sample::{Sample, digest};
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Files smaller than this are hashed in full.
pub const THRESHOLD: u64 = 10 * 1024;
/// Size of each of the three sampled blocks for files at or above [`THRESHOLD`].
pub const BLOCK_SIZE: u64 = 2 * 1024;

/// Something that can turn a file path into a [`Fingerprint`].
///
/// The identity cache only talks to this trait, so alternative (or
/// instrumented) implementations can be swapped in without touching it.
#[async_trait]
pub trait Fingerprinter: Send + Sync {
    async fn fingerprint(&self, path: &Path) -> Result<Fingerprint>;
}

/// The default [`Fingerprinter`]: sampled FNV-1a as described in the crate docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampledFingerprinter;

#[async_trait]
impl Fingerprinter for SampledFingerprinter {
    async fn fingerprint(&self, path: &Path) -> Result<Fingerprint> {
        sample::fingerprint_file(path).await
    }
}

/// Fingerprint the file at `path` with the [`SampledFingerprinter`].
pub async fn fingerprint(path: impl AsRef<Path>) -> Result<Fingerprint> {
    sample::fingerprint_file(path.as_ref()).await
}
