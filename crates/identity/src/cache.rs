use crate::error::{ErrorKind, Result};
use crate::index::FingerprintIndex;
use crate::profile::{FileProfile, Stat};
use exn::ResultExt;
use reel_asyncutils::SingleFlight;
use reel_fingerprint::{Fingerprint, Fingerprinter, SampledFingerprinter};
use reel_store::{KeyDigest, ShardedStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// The profile shards together with the reverse index derived from them.
struct Profiles {
    store: ShardedStore<FileProfile, KeyDigest>,
    index: FingerprintIndex,
}

impl Profiles {
    /// Write `profile` under `key`, moving its index entry if the fingerprint changed.
    async fn record(&self, key: &str, profile: &FileProfile) -> Result<()> {
        let previous = self.store.get(key);
        if let Some(old) = &previous
            && old.fingerprint != profile.fingerprint
        {
            self.index.remove(&old.fingerprint, key);
        }
        self.index.insert(key, profile);
        if let Err(err) = self.store.set(key, profile.clone()).await {
            self.index.remove(&profile.fingerprint, key);
            if let Some(old) = &previous {
                self.index.insert(key, old);
            }
            return Err(err).or_raise(|| ErrorKind::Persist(profile.path.clone()));
        }
        Ok(())
    }

    async fn remove(&self, key: &str, path: &Path) -> Result<Option<FileProfile>> {
        let removed = self.store.delete(key).await.or_raise(|| ErrorKind::Persist(path.to_path_buf()))?;
        if let Some(old) = &removed {
            self.index.remove(&old.fingerprint, key);
            tracing::debug!(path = %path.display(), fingerprint = %old.fingerprint, "Forgot file profile");
        }
        Ok(removed)
    }
}

type Outcome = std::result::Result<FileProfile, ErrorKind>;

/// Maps file paths to content fingerprints without re-hashing unchanged files.
///
/// Profiles live in a [`ShardedStore`] keyed by the normalized path (see
/// [`crate::path::key`]); a profile is reused as long as the file's size and
/// modification time are unchanged. An in-memory reverse index answers "where
/// else have I seen this content?".
///
/// Cloning is cheap and clones share all state.
#[derive(Clone)]
pub struct IdentityCache {
    profiles: Arc<Profiles>,
    fingerprinter: Arc<dyn Fingerprinter>,
    flights: SingleFlight<String, Outcome>,
}

impl std::fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCache")
            .field("dir", &self.profiles.store.dir())
            .field("profiles", &self.profiles.store.len())
            .field("in_flight", &self.flights.len())
            .finish()
    }
}

impl IdentityCache {
    /// Open (or create) the cache in `dir` using the [`SampledFingerprinter`].
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_fingerprinter(dir, Arc::new(SampledFingerprinter)).await
    }

    #[instrument(skip_all)]
    pub async fn with_fingerprinter(dir: impl Into<PathBuf>, fingerprinter: Arc<dyn Fingerprinter>) -> Result<Self> {
        let store = ShardedStore::open(dir).await.or_raise(|| ErrorKind::Store)?;
        let index = FingerprintIndex::default();
        index.rebuild(store.entries());
        tracing::info!(
            dir = %store.dir().display(),
            profiles = store.len(),
            fingerprints = index.len(),
            "Built fingerprint index"
        );
        Ok(Self {
            profiles: Arc::new(Profiles { store, index }),
            fingerprinter,
            flights: SingleFlight::new(),
        })
    }

    /// The profile for `path`, or `None` if the file is gone or couldn't be
    /// fingerprinted. Failures are logged, never returned.
    pub async fn profile(&self, path: impl AsRef<Path>) -> Option<FileProfile> {
        let path = path.as_ref();
        match self.try_profile(path).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::error!(path = %path.display(), error = ?err, "Could not resolve file profile");
                None
            },
        }
    }

    /// Like [`profile`](Self::profile) but reports failures.
    ///
    /// `Ok(None)` means the path is not a readable regular file; any profile
    /// previously stored for it has been dropped. Concurrent calls for the
    /// same path share one fingerprint computation and see the same result.
    pub async fn try_profile(&self, path: impl AsRef<Path>) -> Result<Option<FileProfile>> {
        let path = path.as_ref();
        let key = crate::path::key(path);

        let Some(stat) = Stat::of(path).await else {
            self.profiles.remove(&key, path).await?;
            return Ok(None);
        };
        if let Some(cached) = self.profiles.store.get(&key)
            && cached.matches(&stat)
        {
            return Ok(Some(cached));
        }

        let profiles = Arc::clone(&self.profiles);
        let fingerprinter = Arc::clone(&self.fingerprinter);
        let owned = path.to_path_buf();
        let flight_key = key.clone();
        let flight = self.flights.run(key, move || async move {
            compute(&profiles, fingerprinter.as_ref(), owned, &flight_key, stat).await.map_err(|err| {
                tracing::error!(error = ?err, "Fingerprint calculation failed");
                (*err).clone()
            })
        });
        flight.await.map(Some).map_err(exn::Exn::from)
    }

    /// Every known path whose content had this fingerprint and whose size and
    /// mtime are still unchanged. Stale entries are skipped but kept.
    pub async fn known_paths(&self, fingerprint: &Fingerprint) -> Vec<FileProfile> {
        let candidates = self.profiles.index.candidates(fingerprint);
        let checks = candidates.into_iter().map(|profile| async move {
            let stat = Stat::of(&profile.path).await?;
            profile.matches(&stat).then_some(profile)
        });
        futures::future::join_all(checks).await.into_iter().flatten().collect()
    }

    /// Drop the stored profile for `path`, if any.
    pub async fn forget(&self, path: impl AsRef<Path>) -> Result<Option<FileProfile>> {
        let path = path.as_ref();
        self.profiles.remove(&crate::path::key(path), path).await
    }

    /// The stored profile for `path` without checking the file.
    pub fn cached(&self, path: impl AsRef<Path>) -> Option<FileProfile> {
        self.profiles.store.get(&crate::path::key(path))
    }

    /// Number of stored profiles.
    pub fn len(&self) -> usize {
        self.profiles.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.store.is_empty()
    }
}

async fn compute(
    profiles: &Profiles,
    fingerprinter: &dyn Fingerprinter,
    path: PathBuf,
    key: &str,
    stat: Stat,
) -> Result<FileProfile> {
    tracing::debug!(path = %path.display(), size = stat.size, "Calculating fingerprint");
    let fingerprint = fingerprinter
        .fingerprint(&path)
        .await
        .or_raise(|| ErrorKind::Fingerprint(path.clone()))?;
    let profile = FileProfile::new(crate::path::normalize(&path), stat, fingerprint);
    profiles.record(key, &profile).await?;
    Ok(profile)
}
