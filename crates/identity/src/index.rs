use crate::FileProfile;
use reel_fingerprint::Fingerprint;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

/// In-memory reverse index: fingerprint → profiles carrying it, by path key.
///
/// Never persisted. It is rebuilt from the profile shards on startup and
/// kept in step with them on every write.
#[derive(Debug, Default)]
pub(crate) struct FingerprintIndex {
    entries: RwLock<HashMap<Fingerprint, BTreeMap<String, FileProfile>>>,
}

impl FingerprintIndex {
    pub fn rebuild(&self, profiles: impl IntoIterator<Item = (String, FileProfile)>) {
        let mut rebuilt: HashMap<Fingerprint, BTreeMap<String, FileProfile>> = HashMap::new();
        for (key, profile) in profiles {
            rebuilt.entry(profile.fingerprint.clone()).or_default().insert(key, profile);
        }
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = rebuilt;
    }

    pub fn insert(&self, key: &str, profile: &FileProfile) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(profile.fingerprint.clone()).or_default().insert(key.to_string(), profile.clone());
    }

    pub fn remove(&self, fingerprint: &Fingerprint, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(profiles) = entries.get_mut(fingerprint) {
            profiles.remove(key);
            if profiles.is_empty() {
                entries.remove(fingerprint);
            }
        }
    }

    pub fn candidates(&self, fingerprint: &Fingerprint) -> Vec<FileProfile> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(fingerprint).map(|profiles| profiles.values().cloned().collect()).unwrap_or_default()
    }

    /// Number of distinct fingerprints.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
