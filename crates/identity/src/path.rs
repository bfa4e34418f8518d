//! Path normalization for cache keys.
//!
//! Two spellings of the same file (`/a/./b.mp4`, `/a/x/../b.mp4`, or a
//! relative path from the right working directory) must map to one profile.

use std::path::{Component, Path, PathBuf};

/// Whether the platform's default filesystems compare names case-insensitively.
pub const CASE_INSENSITIVE: bool = cfg!(any(windows, target_os = "macos"));

/// Make `path` absolute and resolve `.` and `..` lexically.
///
/// The filesystem is never consulted, so symlinks are not resolved and the
/// path doesn't need to exist. `..` at the root stays at the root.
///
/// ```
/// use reel_identity::path::normalize;
/// use std::path::Path;
/// # #[cfg(unix)]
/// assert_eq!(normalize("/media/./films/../clips//a.mp4"), Path::new("/media/clips/a.mp4"));
/// ```
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                },
                Some(Component::RootDir | Component::Prefix(_)) => {},
                _ => normalized.push(".."),
            },
            other => normalized.push(other),
        }
    }
    normalized
}

/// The string a path is stored under: [`normalize`]d, and case-folded on
/// platforms where the filesystem ignores case.
pub fn key(path: impl AsRef<Path>) -> String {
    let normalized = normalize(path).to_string_lossy().into_owned();
    match CASE_INSENSITIVE {
        true => normalized.to_lowercase(),
        false => normalized,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/media/a.mp4", "/media/a.mp4")]
    #[case("/media/./a.mp4", "/media/a.mp4")]
    #[case("/media//films/../a.mp4", "/media/a.mp4")]
    #[case("/media/films/", "/media/films")]
    #[case("/../media/a.mp4", "/media/a.mp4")]
    #[case("/", "/")]
    fn test_normalize(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), Path::new(expected));
    }

    #[test]
    fn test_relative_paths_become_absolute() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(normalize("clips/../a.mp4"), normalize(cwd.join("a.mp4")));
        assert!(normalize("a.mp4").is_absolute());
    }

    #[test]
    fn test_key_matches_equivalent_spellings() {
        assert_eq!(key("/media/films/../a.mp4"), key("/media/./a.mp4"));
        assert_eq!(key("/media/A.mp4") == key("/media/a.mp4"), CASE_INSENSITIVE);
    }
}
