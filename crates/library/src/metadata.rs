//! Per-content metadata, keyed by fingerprint.
//!
//! The table is a [`ShardedStore`] sharded by the leading hex digit of the
//! fingerprint. Application code gets a fingerprint from the
//! [`IdentityCache`] and reads or patches the record directly; the helpers
//! here do both steps for a path.

use crate::annotation::{Annotation, AnnotationPatch};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use reel_identity::{FileProfile, IdentityCache};
use reel_store::{LeadingHex, ShardedStore};
use std::path::Path;

/// Directory below the data directory holding the annotation shards.
pub const ANNOTATION_DIR: &str = "annotation";

/// Fingerprint-keyed records of type `V`.
pub type MetadataTable<V = Annotation> = ShardedStore<V, LeadingHex>;

/// Open the annotation table in `<data_dir>/annotation`.
pub async fn open_annotations(data_dir: impl AsRef<Path>) -> Result<MetadataTable> {
    let table = MetadataTable::open(data_dir.as_ref().join(ANNOTATION_DIR)).await.or_raise(|| ErrorKind::Metadata)?;
    tracing::info!(records = table.len(), "Loaded annotations");
    Ok(table)
}

/// The file's profile and its annotation (if it has one).
///
/// `None` if the path isn't a readable file.
pub async fn lookup(
    identity: &IdentityCache,
    table: &MetadataTable,
    path: impl AsRef<Path>,
) -> Result<Option<(FileProfile, Option<Annotation>)>> {
    let Some(profile) = identity.try_profile(path).await.or_raise(|| ErrorKind::Identity)? else {
        return Ok(None);
    };
    let annotation = table.get(profile.fingerprint.as_str());
    Ok(Some((profile, annotation)))
}

/// Apply `patch` to the annotation of the file at `path`, creating it if
/// needed and recording the path. `None` if the path isn't a readable file.
pub async fn annotate(
    identity: &IdentityCache,
    table: &MetadataTable,
    path: impl AsRef<Path>,
    mut patch: AnnotationPatch,
) -> Result<Option<(FileProfile, Annotation)>> {
    let Some(profile) = identity.try_profile(path).await.or_raise(|| ErrorKind::Identity)? else {
        return Ok(None);
    };
    patch.add_paths.push(profile.path.to_string_lossy().into_owned());
    let annotation = table.update(profile.fingerprint.as_str(), patch).await.or_raise(|| ErrorKind::Metadata)?;
    tracing::info!(path = %profile.path.display(), fingerprint = %profile.fingerprint, "Updated annotation");
    Ok(Some((profile, annotation)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Rotation;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_annotate_and_lookup_by_path() {
        let media = tempdir().unwrap();
        let data = tempdir().unwrap();
        let identity = IdentityCache::open(data.path().join("file_profile")).await.unwrap();
        let table = open_annotations(data.path()).await.unwrap();
        let path = media.path().join("clip.mp4");
        std::fs::write(&path, b"hello").unwrap();

        let (profile, annotation) = lookup(&identity, &table, &path).await.unwrap().unwrap();
        assert_eq!(profile.fingerprint.as_str(), "764b948efcba6ace");
        assert_eq!(annotation, None);

        let patch = AnnotationPatch { like_count: Some(1), rotation: Some(Rotation::Deg90), ..Default::default() };
        let (_, annotation) = annotate(&identity, &table, &path, patch).await.unwrap().unwrap();
        assert_eq!(annotation.like_count, 1);
        assert_eq!(annotation.rotation, Rotation::Deg90);
        assert_eq!(annotation.paths, vec![path.to_string_lossy().into_owned()]);

        // Stored under the fingerprint's leading digit.
        assert!(data.path().join(ANNOTATION_DIR).join("7.json").exists());
        let (_, stored) = lookup(&identity, &table, &path).await.unwrap().unwrap();
        assert_eq!(stored, Some(annotation));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_relative_path_is_recorded_absolute() {
        use crate::reconcile::{FingerprintedFile, Summary, reconcile};
        use std::path::PathBuf;

        let media = tempdir().unwrap();
        let data = tempdir().unwrap();
        let identity = IdentityCache::open(data.path().join("file_profile")).await.unwrap();
        let table = open_annotations(data.path()).await.unwrap();
        let path = media.path().join("clip.mp4");
        std::fs::write(&path, b"hello").unwrap();
        // The same file, spelled relative to the working directory.
        let cwd = std::env::current_dir().unwrap();
        let relative: PathBuf =
            cwd.components().skip(1).map(|_| "..").collect::<PathBuf>().join(path.strip_prefix("/").unwrap());

        let patch = AnnotationPatch { is_favorite: Some(true), ..Default::default() };
        let (profile, annotation) = annotate(&identity, &table, &relative, patch).await.unwrap().unwrap();
        assert_eq!(profile.path, path);
        assert_eq!(annotation.paths, vec![path.to_string_lossy().into_owned()]);

        // A scan reporting the absolute path sees nothing to do.
        let scanned = [FingerprintedFile { path: path.clone(), fingerprint: profile.fingerprint.clone() }];
        let summary = reconcile(&scanned, &table).await.unwrap();
        assert_eq!(summary, Summary { total: 1, ..Default::default() });
        assert_eq!(table.get(profile.fingerprint.as_str()).unwrap().paths, annotation.paths);
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let data = tempdir().unwrap();
        let identity = IdentityCache::open(data.path().join("file_profile")).await.unwrap();
        let table = open_annotations(data.path()).await.unwrap();
        let missing = data.path().join("missing.mp4");
        assert!(lookup(&identity, &table, &missing).await.unwrap().is_none());
        assert!(annotate(&identity, &table, &missing, AnnotationPatch::default()).await.unwrap().is_none());
        assert!(table.is_empty());
    }
}
