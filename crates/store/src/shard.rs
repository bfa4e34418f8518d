use derive_more::Display;

/// One of the sixteen partitions of a store, persisted as `{id}.json`.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("{_0:x}")]
pub struct ShardId(u8);

impl ShardId {
    /// Number of shards in every store.
    pub const COUNT: usize = 16;

    /// Shard for the low nibble of `value`.
    pub fn from_nibble(value: u8) -> Self {
        Self(value & 0x0f)
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// All shards, in order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self)
    }

    pub fn file_name(self) -> String {
        format!("{self}.json")
    }
}

/// Maps a key to the shard that owns it.
///
/// Implementations must be pure: the same key always lands in the same shard,
/// otherwise records written in one run become invisible in the next.
pub trait Sharding: Send + Sync + 'static {
    fn shard(key: &str) -> ShardId;
}

/// Shards by the first character of keys that are already hex digests (such
/// as content fingerprints). Keys that don't start with a hex digit fall back
/// to [`KeyDigest`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LeadingHex;

impl Sharding for LeadingHex {
    fn shard(key: &str) -> ShardId {
        match key.chars().next().and_then(|c| c.to_digit(16)) {
            // to_digit(16) is always < 16.
            Some(digit) => ShardId::from_nibble(digit as u8),
            None => KeyDigest::shard(key),
        }
    }
}

/// Shards by the first nibble of the BLAKE3 hash of the key, for keys with
/// no useful distribution of their own (file paths).
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyDigest;

impl Sharding for KeyDigest {
    fn shard(key: &str) -> ShardId {
        let hash = blake3::hash(key.as_bytes());
        ShardId::from_nibble(hash.as_bytes()[0] >> 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;

    #[test]
    fn test_all_shards() {
        let all: Vec<_> = ShardId::all().collect();
        assert_eq!(all.len(), ShardId::COUNT);
        assert_eq!(all.iter().copied().collect::<HashSet<_>>().len(), ShardId::COUNT);
        assert_eq!(all[0].file_name(), "0.json");
        assert_eq!(all[10].file_name(), "a.json");
        assert_eq!(all[15].to_string(), "f");
    }

    #[rstest]
    #[case("a8c7f832281a39c5", 0xa)]
    #[case("0000000000000000", 0x0)]
    #[case("F00", 0xf)]
    #[case("9", 0x9)]
    fn test_leading_hex(#[case] key: &str, #[case] expected: usize) {
        assert_eq!(LeadingHex::shard(key).index(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("zebra")]
    #[case("/media/films/a.mkv")]
    fn test_leading_hex_falls_back_to_digest(#[case] key: &str) {
        assert_eq!(LeadingHex::shard(key), KeyDigest::shard(key));
    }

    #[test]
    fn test_key_digest_is_deterministic_and_spread() {
        let keys: Vec<String> = (0..512).map(|i| format!("/media/clips/{i:04}.mp4")).collect();
        let first: Vec<_> = keys.iter().map(|k| KeyDigest::shard(k)).collect();
        let second: Vec<_> = keys.iter().map(|k| KeyDigest::shard(k)).collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|id| id.index() < ShardId::COUNT));
        // 512 keys over 16 shards: every shard gets something.
        assert_eq!(first.into_iter().collect::<HashSet<_>>().len(), ShardId::COUNT);
    }
}
