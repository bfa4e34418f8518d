//! Discovering media files under the library roots.
//!
//! A [`Scanner`] walks one or more root directories, skipping blacklisted
//! sub-trees and anything that doesn't look like a video, and streams a
//! [`ScannedFile`] for every match. See [`Scanner::walk`].

mod walk;

use reel_identity::path;
use std::collections::BTreeSet;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// File extensions (lowercase, without the dot) treated as media by default.
pub const DEFAULT_EXTENSIONS: &[&str] =
    &["mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpg", "mpeg", "3gp", "ts", "mts", "m2ts"];

/// How many files [`newest`] returns when the caller has no preference.
pub const DEFAULT_NEWEST_LIMIT: usize = 100;

/// A media file found during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub size: u64,
    pub modified: OffsetDateTime,
    /// Birth time, or the modification time where the platform has none.
    pub created: OffsetDateTime,
}

impl ScannedFile {
    pub(crate) fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        let modified = metadata.modified().map(OffsetDateTime::from).unwrap_or(OffsetDateTime::UNIX_EPOCH);
        let created = metadata.created().map(OffsetDateTime::from).unwrap_or(modified);
        Self { path, size: metadata.len(), modified, created }
    }
}

/// The `limit` most recently created files, newest first.
pub fn newest(files: impl IntoIterator<Item = ScannedFile>, limit: usize) -> Vec<ScannedFile> {
    let mut files: Vec<_> = files.into_iter().collect();
    files.sort_by(|a, b| b.created.cmp(&a.created));
    files.truncate(limit);
    files
}

/// Which directories to walk, which to avoid, and what counts as media.
#[derive(Debug, Clone)]
pub struct Scanner {
    roots: Vec<PathBuf>,
    blacklist: Vec<PathBuf>,
    extensions: BTreeSet<String>,
}

impl Scanner {
    /// Scan `roots` for files with the [`DEFAULT_EXTENSIONS`].
    ///
    /// Roots are normalized, and a root inside another root is dropped so no
    /// file is reported twice.
    pub fn new(roots: impl IntoIterator<Item = impl AsRef<Path>>) -> Self {
        let mut normalized: Vec<PathBuf> = roots.into_iter().map(path::normalize).collect();
        normalized.sort();
        let mut collapsed: Vec<PathBuf> = Vec::with_capacity(normalized.len());
        for root in normalized {
            // Sorted, so an enclosing root always comes before its children.
            if !collapsed.iter().any(|kept| root.starts_with(kept)) {
                collapsed.push(root);
            }
        }
        Self {
            roots: collapsed,
            blacklist: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }

    /// Skip these directories (and everything below them).
    pub fn with_blacklist(mut self, blacklist: impl IntoIterator<Item = impl AsRef<Path>>) -> Self {
        self.blacklist = blacklist.into_iter().map(|p| PathBuf::from(path::key(p))).collect();
        self
    }

    /// Replace the set of media extensions. Matching ignores case and a leading dot.
    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Whether `path` is, or is below, a blacklisted directory.
    ///
    /// Matching is per path component: blacklisting `/media/tmp` does not
    /// affect `/media/tmp2`.
    pub fn is_blacklisted(&self, path: impl AsRef<Path>) -> bool {
        if self.blacklist.is_empty() {
            return false;
        }
        let key = PathBuf::from(path::key(path));
        self.blacklist.iter().any(|blacklisted| key.starts_with(blacklisted))
    }

    /// Whether the file name has one of the media extensions.
    pub fn is_media(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_ascii_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn scanned(name: &str, created: i64) -> ScannedFile {
        let created = OffsetDateTime::from_unix_timestamp(created).unwrap();
        ScannedFile { path: PathBuf::from(name), size: 1, modified: created, created }
    }

    #[rstest]
    #[case("movie.mp4", true)]
    #[case("MOVIE.MKV", true)]
    #[case("clip.m2ts", true)]
    #[case("archive.tar.ts", true)]
    #[case("notes.txt", false)]
    #[case("mp4", false)]
    #[case(".mp4", false)]
    fn test_default_extensions(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(Scanner::new(["/media"]).is_media(name), expected);
    }

    #[test]
    fn test_custom_extensions() {
        let scanner = Scanner::new(["/media"]).with_extensions([".MP4", "gif", ""]);
        assert!(scanner.is_media("a.mp4"));
        assert!(scanner.is_media("a.GIF"));
        assert!(!scanner.is_media("a.mkv"));
    }

    #[cfg(unix)]
    #[rstest]
    #[case("/media/trash", true)]
    #[case("/media/trash/a.mp4", true)]
    #[case("/media/./trash/deep/a.mp4", true)]
    #[case("/media/trash2/a.mp4", false)]
    #[case("/media/a.mp4", false)]
    fn test_blacklist_is_component_wise(#[case] candidate: &str, #[case] expected: bool) {
        let scanner = Scanner::new(["/media"]).with_blacklist(["/media/trash/", "/elsewhere"]);
        assert_eq!(scanner.is_blacklisted(candidate), expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_overlapping_roots_collapse() {
        let scanner = Scanner::new(["/media/films/short", "/media/films", "/media/./films", "/music", "/media/film"]);
        assert_eq!(
            scanner.roots(),
            &[PathBuf::from("/media/film"), PathBuf::from("/media/films"), PathBuf::from("/music")]
        );
    }

    #[test]
    fn test_newest() {
        let files = vec![scanned("b", 200), scanned("a", 100), scanned("c", 300)];
        let names: Vec<_> = newest(files.clone(), 2).into_iter().map(|f| f.path).collect();
        assert_eq!(names, vec![PathBuf::from("c"), PathBuf::from("b")]);
        assert_eq!(newest(files, DEFAULT_NEWEST_LIMIT).len(), 3);
        assert!(newest(Vec::new(), 10).is_empty());
    }
}
