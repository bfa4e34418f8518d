//! Sharded persistent key-value store.
//!
//! A [`ShardedStore`] keeps a string-keyed map fully in memory, split into
//! sixteen shards. Each shard is persisted on its own as `0.json` ... `f.json`
//! inside the store directory, so writing one record only ever rewrites one
//! sixteenth of the data. Which shard owns a key is decided by a [`Sharding`]
//! strategy chosen at the type level.
//!
//! # Layout
//! ```text
//! <dir>/
//!   0.json   {"<key>": <value>, ...}
//!   1.json
//!   ...
//!   f.json
//! ```

pub mod error;
mod shard;
mod store;

pub use crate::shard::{KeyDigest, LeadingHex, ShardId, Sharding};
pub use crate::store::{Patch, ShardedStore};
