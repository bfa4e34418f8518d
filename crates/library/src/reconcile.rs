//! Synchronizing a fresh scan with the metadata table.
//!
//! Every scanned file falls in one of four cases:
//! 1. **New**: nothing is recorded for its fingerprint. Only counted; a record
//!    is created the first time the user annotates the content.
//! 2. **Moved**: a record exists but doesn't list this path yet. The path is
//!    appended, so annotations follow renames and moves.
//! 3. **Duplicate**: the fingerprint was already seen earlier in this scan.
//!    The first file wins; later ones are only counted.
//! 4. **Deleted**: a record's fingerprint wasn't scanned at all. The record is
//!    removed unless it carries something valuable (see [`Tracked::is_valuable`]).

use crate::error::{ErrorKind, Result};
use crate::metadata::MetadataTable;
use exn::ResultExt;
use reel_identity::Fingerprint;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::instrument;

/// A metadata record that remembers where its content has been seen.
pub trait Tracked {
    fn paths(&self) -> &[String];
    /// Record another path. Adding a known path is a no-op.
    fn add_path(&mut self, path: String);
    /// Whether the record must survive its content disappearing.
    fn is_valuable(&self) -> bool;
}

/// A scanned file whose identity has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintedFile {
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
}

/// Counts produced by [`reconcile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Scanned files that made it to reconciliation.
    pub total: usize,
    pub new: usize,
    pub moved: usize,
    pub duplicate: usize,
    pub deleted: usize,
}

/// Reconcile `files` (in scan order) against `table`, mutating the table.
///
/// Only the writes of moved and deleted records touch the disk. A failed
/// write aborts reconciliation; records already written stay written and the
/// next run picks up where this one stopped.
#[instrument(skip_all, fields(files = files.len()))]
pub async fn reconcile<V>(files: &[FingerprintedFile], table: &MetadataTable<V>) -> Result<Summary>
where
    V: Tracked + Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static,
{
    let mut summary = Summary { total: files.len(), ..Default::default() };

    let mut seen: HashSet<&str> = HashSet::with_capacity(files.len());
    let mut distinct = Vec::with_capacity(files.len());
    for file in files {
        if seen.insert(file.fingerprint.as_str()) {
            distinct.push(file);
        } else {
            tracing::debug!(path = %file.path.display(), fingerprint = %file.fingerprint, "Duplicate content");
            summary.duplicate += 1;
        }
    }

    for file in distinct {
        let key = file.fingerprint.as_str();
        let path = file.path.to_string_lossy().into_owned();
        match table.get(key) {
            None => {
                tracing::debug!(path = %path, fingerprint = key, "New content");
                summary.new += 1;
            },
            Some(record) if !record.paths().contains(&path) => {
                tracing::debug!(path = %path, fingerprint = key, "Content seen at a new path");
                table.update_with(key, |record| record.add_path(path)).await.or_raise(|| ErrorKind::Metadata)?;
                summary.moved += 1;
            },
            Some(_) => {},
        }
    }

    for (key, record) in table.entries() {
        if seen.contains(key.as_str()) {
            continue;
        }
        if record.is_valuable() {
            tracing::debug!(fingerprint = %key, "Content missing but annotated; keeping record");
            continue;
        }
        if table.delete(&key).await.or_raise(|| ErrorKind::Metadata)?.is_some() {
            tracing::debug!(fingerprint = %key, "Content gone; deleted record");
            summary.deleted += 1;
        }
    }

    tracing::info!(
        total = summary.total,
        new = summary.new,
        moved = summary.moved,
        duplicate = summary.duplicate,
        deleted = summary.deleted,
        "Reconciled library"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Annotation, AnnotationPatch};
    use tempfile::{TempDir, tempdir};

    const FP_A: &str = "a000000000000001";
    const FP_B: &str = "b000000000000002";
    const FP_C: &str = "c000000000000003";

    fn file(path: &str, fingerprint: &str) -> FingerprintedFile {
        FingerprintedFile { path: PathBuf::from(path), fingerprint: fingerprint.parse().unwrap() }
    }

    async fn table() -> (TempDir, MetadataTable) {
        let dir = tempdir().unwrap();
        let table = MetadataTable::open(dir.path()).await.unwrap();
        (dir, table)
    }

    fn with_paths(paths: &[&str]) -> Annotation {
        Annotation { paths: paths.iter().map(|p| p.to_string()).collect(), ..Default::default() }
    }

    #[tokio::test]
    async fn test_new_files_are_counted_not_created() {
        let (_dir, table) = table().await;
        let summary = reconcile(&[file("/a/one.mp4", FP_A), file("/a/two.mp4", FP_B)], &table).await.unwrap();
        assert_eq!(summary, Summary { total: 2, new: 2, ..Default::default() });
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_move_preserves_annotation() {
        let (_dir, table) = table().await;
        let favorite = Annotation { is_favorite: true, ..with_paths(&["/a/old.mp4"]) };
        table.set(FP_A, favorite).await.unwrap();

        let summary = reconcile(&[file("/a/new.mp4", FP_A)], &table).await.unwrap();
        assert_eq!(summary.moved, 1);
        let record = table.get(FP_A).unwrap();
        assert_eq!(record.paths, vec!["/a/old.mp4".to_string(), "/a/new.mp4".to_string()]);
        assert!(record.is_favorite);

        // Second pass: nothing left to do.
        let summary = reconcile(&[file("/a/new.mp4", FP_A)], &table).await.unwrap();
        assert_eq!(summary, Summary { total: 1, ..Default::default() });
    }

    #[tokio::test]
    async fn test_duplicates_first_wins() {
        let (_dir, table) = table().await;
        table.set(FP_A, with_paths(&["/a/x.mp4"])).await.unwrap();

        let files = [file("/a/x.mp4", FP_A), file("/b/copy-of-x.mp4", FP_A), file("/c/y.mp4", FP_B)];
        let summary = reconcile(&files, &table).await.unwrap();
        assert_eq!(summary, Summary { total: 3, new: 1, duplicate: 1, ..Default::default() });
        // The duplicate's path is not recorded.
        assert_eq!(table.get(FP_A).unwrap().paths, vec!["/a/x.mp4".to_string()]);
    }

    #[tokio::test]
    async fn test_deletion_keeps_valuable_records() {
        let (_dir, table) = table().await;
        table.set(FP_A, Annotation { is_favorite: true, ..with_paths(&["/a/fav.mp4"]) }).await.unwrap();
        table.set(FP_B, with_paths(&["/a/plain.mp4"])).await.unwrap();
        table.set(FP_C, with_paths(&["/a/here.mp4"])).await.unwrap();

        let summary = reconcile(&[file("/a/here.mp4", FP_C)], &table).await.unwrap();
        assert_eq!(summary.deleted, 1);
        assert!(table.contains(FP_A));
        assert!(!table.contains(FP_B));
        assert!(table.contains(FP_C));
    }

    #[tokio::test]
    async fn test_empty_scan_prunes_everything_unvaluable() {
        let (dir, table) = table().await;
        table.update(FP_A, AnnotationPatch { like_count: Some(2), ..Default::default() }).await.unwrap();
        table.set(FP_B, Annotation::default()).await.unwrap();

        let summary = reconcile(&[], &table).await.unwrap();
        assert_eq!(summary, Summary { deleted: 1, ..Default::default() });
        let reopened: MetadataTable = MetadataTable::open(dir.path()).await.unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get(FP_A).unwrap().like_count, 2);
    }
}
