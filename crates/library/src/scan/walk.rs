use crate::error::{Error, ErrorKind, Result};
use crate::scan::{ScannedFile, Scanner};
use async_stream::stream;
use futures::Stream;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};

enum WalkEntry {
    File(ScannedFile),
    Descend(PathBuf),
    Skip,
}

fn walk_error(err: std::io::Error, path: &Path) -> Error {
    exn::Exn::from(err).raise(ErrorKind::Walk(path.to_path_buf()))
}

impl Scanner {
    /// Stream every media file below the roots.
    ///
    /// Directories are walked depth-first with an explicit stack. A root that
    /// doesn't exist yields nothing. Directories that can't be listed and
    /// files that can't be stat'ed are yielded as `Err` items and the walk
    /// carries on. Symlinks to files are followed, symlinks to directories are
    /// not (so cycles can't happen).
    pub fn walk(&self) -> impl Stream<Item = Result<ScannedFile>> + '_ {
        let mut stack: Vec<PathBuf> = self.roots.iter().rev().cloned().collect();

        stream! {
            'dirs: while let Some(current) = stack.pop() {
                if self.is_blacklisted(&current) {
                    tracing::debug!(path = %current.display(), "Skipping blacklisted directory");
                    continue 'dirs;
                }
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue 'dirs,
                    Err(err) => {
                        yield Err(walk_error(err, &current));
                        continue 'dirs;
                    },
                };
                // Children are pushed in reverse so they are visited in listing order.
                let mut children = Vec::new();
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(err) => {
                            yield Err(walk_error(err, &current));
                            break 'entries;
                        },
                    };
                    match self.process_entry(entry).await {
                        Ok(WalkEntry::File(file)) => yield Ok(file),
                        Ok(WalkEntry::Descend(dir)) => children.push(dir),
                        Ok(WalkEntry::Skip) => {},
                        Err(err) => yield Err(err),
                    };
                }
                stack.extend(children.into_iter().rev());
            }
        }
    }

    async fn process_entry(&self, entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(|err| walk_error(err, &path))?;
        if file_type.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if !self.is_media(&path) {
            return Ok(WalkEntry::Skip);
        }
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            // Dangling symlink.
            Err(err) if file_type.is_symlink() && err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(WalkEntry::Skip);
            },
            Err(err) => return Err(walk_error(err, &path)),
        };
        if !metadata.is_file() {
            return Ok(WalkEntry::Skip);
        }
        Ok(WalkEntry::File(ScannedFile::from_metadata(path, &metadata)))
    }
}
