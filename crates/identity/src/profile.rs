use reel_fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use time::OffsetDateTime;

/// What the cache knows about one physical file.
///
/// A profile is only trusted while the file's current size and modification
/// time still equal the ones recorded here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProfile {
    /// Absolute, with `.` and `..` resolved. Case is kept as it was given.
    pub path: PathBuf,
    /// Modification time in milliseconds since the Unix epoch.
    pub mtime: i64,
    pub size: u64,
    pub fingerprint: Fingerprint,
}

impl FileProfile {
    pub(crate) fn new(path: PathBuf, stat: Stat, fingerprint: Fingerprint) -> Self {
        Self { path, mtime: stat.mtime, size: stat.size, fingerprint }
    }

    /// Whether this profile still describes a file with the given stat.
    pub(crate) fn matches(&self, stat: &Stat) -> bool {
        self.size == stat.size && self.mtime == stat.mtime
    }

    pub fn modified(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.mtime) * 1_000_000).ok()
    }
}

/// The parts of a file's metadata that decide whether a profile is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Stat {
    pub size: u64,
    pub mtime: i64,
}

impl Stat {
    /// Stat a regular file. Anything that is missing, unreadable or not a
    /// regular file has no stat.
    pub async fn of(path: &Path) -> Option<Self> {
        let metadata = tokio::fs::metadata(path).await.ok()?;
        metadata.is_file().then(|| Self::from_metadata(&metadata))
    }

    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self { size: metadata.len(), mtime: metadata.modified().map(unix_millis).unwrap_or(0) }
    }
}

pub(crate) fn unix_millis(time: SystemTime) -> i64 {
    let nanos = OffsetDateTime::from(time).unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::tempdir;

    #[test]
    fn test_unix_millis() {
        assert_eq!(unix_millis(UNIX_EPOCH), 0);
        assert_eq!(unix_millis(UNIX_EPOCH + Duration::from_micros(1_700_000_000_123_456)), 1_700_000_000_123);
    }

    #[test]
    fn test_matches_requires_size_and_mtime() {
        let profile = FileProfile {
            path: PathBuf::from("/media/a.mp4"),
            mtime: 1_000,
            size: 10,
            fingerprint: Fingerprint::from_u64(1),
        };
        assert!(profile.matches(&Stat { size: 10, mtime: 1_000 }));
        assert!(!profile.matches(&Stat { size: 11, mtime: 1_000 }));
        assert!(!profile.matches(&Stat { size: 10, mtime: 1_001 }));
        assert_eq!(profile.modified().unwrap().unix_timestamp(), 1);
    }

    #[tokio::test]
    async fn test_stat_only_regular_files() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.mp4");
        std::fs::write(&file, b"12345").unwrap();
        let stat = Stat::of(&file).await.unwrap();
        assert_eq!(stat.size, 5);
        assert!(stat.mtime > 0);
        assert_eq!(Stat::of(dir.path()).await, None);
        assert_eq!(Stat::of(&dir.path().join("missing.mp4")).await, None);
    }
}
