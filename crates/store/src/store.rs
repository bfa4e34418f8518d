use crate::error::{ErrorKind, Result};
use crate::{KeyDigest, ShardId, Sharding};
use exn::ResultExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::instrument;

/// An explicit partial update for a stored value.
///
/// Fields the patch doesn't mention keep their current value; a record that
/// doesn't exist yet starts from `V::default()`.
pub trait Patch<V> {
    fn apply(self, target: &mut V);
}

type Entries<V> = BTreeMap<String, V>;

struct Shard<V> {
    entries: RwLock<Entries<V>>,
    // Held while a mutation is applied and written, so the file on disk
    // always reflects the last mutation.
    write: Mutex<()>,
}

impl<V> Shard<V> {
    fn new() -> Self {
        Self { entries: RwLock::new(BTreeMap::new()), write: Mutex::new(()) }
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries<V>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries<V>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn restore(&self, key: String, previous: Option<V>) {
        let mut entries = self.write();
        match previous {
            Some(value) => entries.insert(key, value),
            None => entries.remove(&key),
        };
    }
}

/// A string-keyed map split across sixteen JSON files in one directory.
///
/// Every shard is held in memory; reads never touch the disk. A mutation
/// changes only the owning shard and then rewrites only that shard's file.
/// There is no atomicity across shards.
pub struct ShardedStore<V, S = KeyDigest> {
    dir: PathBuf,
    shards: [Shard<V>; ShardId::COUNT],
    sharding: PhantomData<fn() -> S>,
}

impl<V, S> std::fmt::Debug for ShardedStore<V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedStore").field("dir", &self.dir).finish_non_exhaustive()
    }
}

impl<V, S> ShardedStore<V, S>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
    S: Sharding,
{
    /// Open the store in `dir` (created if missing) and load every shard.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.or_raise(|| ErrorKind::Directory(dir.clone()))?;
        let store = Self {
            dir,
            shards: std::array::from_fn(|_| Shard::new()),
            sharding: PhantomData,
        };
        store.load().await?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read all sixteen shard files concurrently. Only called from [`open`](Self::open):
    /// derived state kept by users of the store (such as a reverse index) is
    /// built from the freshly opened contents.
    ///
    /// A missing file is an empty shard. A file that exists but doesn't parse
    /// is logged and also treated as empty: its records are lost the next time
    /// that shard is written.
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    async fn load(&self) -> Result<()> {
        let loaded = futures::future::try_join_all(ShardId::all().map(|id| self.read_shard(id))).await?;
        let mut total = 0;
        for (id, entries) in ShardId::all().zip(loaded) {
            total += entries.len();
            *self.shard(id).write() = entries;
        }
        tracing::debug!(records = total, "Loaded all shards");
        Ok(())
    }

    async fn read_shard(&self, id: ShardId) -> Result<Entries<V>> {
        let path = self.dir.join(id.file_name());
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err).or_raise(|| ErrorKind::Load(id)),
        };
        match serde_json::from_slice(&bytes) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                tracing::error!(shard = %id, path = %path.display(), error = %err, "Corrupt shard; starting it empty");
                Ok(BTreeMap::new())
            },
        }
    }

    fn shard(&self, id: ShardId) -> &Shard<V> {
        &self.shards[id.index()]
    }

    /// The shard that owns `key`.
    pub fn shard_of(key: &str) -> ShardId {
        S::shard(key)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.shard(S::shard(key)).read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.shard(S::shard(key)).read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    /// Snapshot of every record, shard by shard.
    pub fn entries(&self) -> Vec<(String, V)> {
        let mut all = Vec::with_capacity(self.len());
        for shard in &self.shards {
            all.extend(shard.read().iter().map(|(key, value)| (key.clone(), value.clone())));
        }
        all
    }

    /// Insert or replace the value for `key`, then persist its shard.
    pub async fn set(&self, key: impl Into<String>, value: V) -> Result<()> {
        let key = key.into();
        let id = S::shard(&key);
        let shard = self.shard(id);
        let _guard = shard.write.lock().await;
        let previous = shard.write().insert(key.clone(), value);
        if let Err(err) = self.persist(id).await {
            shard.restore(key, previous);
            return Err(err);
        }
        Ok(())
    }

    /// Apply `patch` to the value for `key` (or to `V::default()` if there is
    /// none), persist, and return the updated value.
    pub async fn update<P>(&self, key: impl Into<String>, patch: P) -> Result<V>
    where
        P: Patch<V>,
        V: Default,
    {
        self.update_with(key, |value| patch.apply(value)).await
    }

    /// Closure form of [`update`](Self::update).
    pub async fn update_with<F>(&self, key: impl Into<String>, change: F) -> Result<V>
    where
        F: FnOnce(&mut V),
        V: Default,
    {
        let key = key.into();
        let id = S::shard(&key);
        let shard = self.shard(id);
        let _guard = shard.write.lock().await;
        let (previous, updated) = {
            let mut entries = shard.write();
            let previous = entries.get(&key).cloned();
            let value = entries.entry(key.clone()).or_default();
            change(value);
            (previous, value.clone())
        };
        if let Err(err) = self.persist(id).await {
            shard.restore(key, previous);
            return Err(err);
        }
        Ok(updated)
    }

    /// Remove `key`, returning the old value. Removing an absent key doesn't
    /// touch the disk.
    pub async fn delete(&self, key: &str) -> Result<Option<V>> {
        let id = S::shard(key);
        let shard = self.shard(id);
        let _guard = shard.write.lock().await;
        let Some(previous) = shard.write().remove(key) else {
            return Ok(None);
        };
        if let Err(err) = self.persist(id).await {
            shard.restore(key.to_string(), Some(previous));
            return Err(err);
        }
        Ok(Some(previous))
    }

    /// Empty every shard and persist all sixteen files.
    ///
    /// Shards whose file can't be written keep their old contents; the first
    /// such failure is returned.
    pub async fn clear(&self) -> Result<()> {
        let results = futures::future::join_all(ShardId::all().map(|id| self.clear_shard(id))).await;
        results.into_iter().collect::<Result<Vec<()>>>()?;
        tracing::info!(dir = %self.dir.display(), "Cleared store");
        Ok(())
    }

    async fn clear_shard(&self, id: ShardId) -> Result<()> {
        let shard = self.shard(id);
        let _guard = shard.write.lock().await;
        let previous = std::mem::take(&mut *shard.write());
        if let Err(err) = self.persist(id).await {
            *shard.write() = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Write a shard to a sibling temporary file and rename it into place.
    ///
    /// Callers must hold the shard's write lock.
    async fn persist(&self, id: ShardId) -> Result<()> {
        let bytes = {
            let entries = self.shard(id).read();
            serde_json::to_vec(&*entries).or_raise(|| ErrorKind::Encode(id))?
        };
        let path = self.dir.join(id.file_name());
        let temp = self.dir.join(format!(".{}.tmp", id.file_name()));
        fs::write(&temp, &bytes).await.or_raise(|| ErrorKind::Persist(id))?;
        if let Err(err) = fs::rename(&temp, &path).await {
            _ = fs::remove_file(&temp).await;
            return Err(err).or_raise(|| ErrorKind::Persist(id));
        }
        tracing::trace!(shard = %id, bytes = bytes.len(), "Persisted shard");
        Ok(())
    }
}
