//! Content identity for files on disk.
//!
//! The [`IdentityCache`] answers two questions cheaply:
//! - what is the content fingerprint of the file at this path, and
//! - at which other paths has the same content been seen?
//!
//! Fingerprints are only recomputed when a file's size or modification time
//! changes, and concurrent requests for the same path share one computation.
//! Profiles are persisted under `<dir>/{0..f}.json`.

mod cache;
pub mod error;
mod index;
pub mod path;
mod profile;

pub use crate::cache::IdentityCache;
pub use crate::profile::FileProfile;
pub use reel_fingerprint::Fingerprint;

/// Directory below the data directory holding the profile shards.
pub const PROFILE_DIR: &str = "file_profile";
