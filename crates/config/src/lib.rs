//! Configuration for reel.
//!
//! Loaded with precedence: environment > config file > defaults.
//!
//! # Example config file (config.toml)
//! ```toml
//! data_dir = "/var/lib/reel"
//! concurrency = 32
//!
//! [library]
//! roots = ["/media/films", "/media/clips"]
//! blacklist = ["/media/clips/.trash"]
//! extensions = ["mp4", "mkv"]
//! ```
//!
//! Every key can be overridden from the environment with a `REEL_` prefix and
//! `__` between nesting levels, e.g. `REEL_DATA_DIR=/tmp/reel` or
//! `REEL_LIBRARY__ROOTS='["/media"]'`.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "REEL_";
/// Number of files fingerprinted at once during a refresh, unless configured.
pub const DEFAULT_CONCURRENCY: usize = 100;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "reel")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where profiles and annotations are persisted.
    pub data_dir: PathBuf,
    pub library: LibraryConfig,
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: project_dirs().map(|dirs| dirs.data_dir().to_path_buf()).unwrap_or_else(|| PathBuf::from(".reel")),
            library: LibraryConfig::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// What to scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub roots: Vec<PathBuf>,
    /// Directories (and their contents) to leave out.
    pub blacklist: Vec<PathBuf>,
    /// Media file extensions; empty means the built-in list.
    pub extensions: Vec<String>,
}

impl Config {
    /// `config.toml` in the platform config directory.
    pub fn default_file() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `file` (or the [default file](Self::default_file) if it
    /// exists) and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_file().filter(|path| path.is_file()),
        };
        let config: Self = Self::figment(file.as_deref())?
            .extract()
            .map_err(|err| ErrorKind::Invalid(err.to_string()))?;
        config.validate()?;
        tracing::debug!(file = ?file, data_dir = %config.data_dir.display(), "Loaded configuration");
        Ok(config)
    }

    /// The provider stack: defaults, then `file`, then `REEL_*` variables.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("concurrency must be at least 1".to_string()));
        }
        if self.data_dir.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("data_dir must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config = Config::load(None).unwrap();
            assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
            assert!(config.library.roots.is_empty());
            assert!(!config.data_dir.as_os_str().is_empty());
            Ok(())
        });
    }

    #[rstest]
    #[case("reel.toml", "data_dir = \"/srv/reel\"\n[library]\nroots = [\"/media\"]\n")]
    #[case("reel.yaml", "data_dir: /srv/reel\nlibrary:\n  roots: [/media]\n")]
    #[case("reel.yml", "data_dir: /srv/reel\nlibrary:\n  roots: [/media]\n")]
    #[case("reel.json", r#"{"data_dir": "/srv/reel", "library": {"roots": ["/media"]}}"#)]
    fn test_file_formats(#[case] name: &str, #[case] content: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, content)?;
            let config = Config::load(Some(Path::new(name))).unwrap();
            assert_eq!(config.data_dir, PathBuf::from("/srv/reel"));
            assert_eq!(config.library.roots, vec![PathBuf::from("/media")]);
            // Untouched keys keep their defaults.
            assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("reel.toml", "concurrency = 8\n[library]\nblacklist = [\"/media/tmp\"]\n")?;
            jail.set_env("REEL_CONCURRENCY", 3);
            jail.set_env("REEL_LIBRARY__EXTENSIONS", "[\"mp4\", \"mkv\"]");
            let config = Config::load(Some(Path::new("reel.toml"))).unwrap();
            assert_eq!(config.concurrency, 3);
            assert_eq!(config.library.blacklist, vec![PathBuf::from("/media/tmp")]);
            assert_eq!(config.library.extensions, vec!["mp4".to_string(), "mkv".to_string()]);
            Ok(())
        });
    }

    #[test]
    fn test_errors() {
        Jail::expect_with(|jail| {
            let err = Config::load(Some(Path::new("missing.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::NotFound(_)));

            jail.create_file("reel.ini", "concurrency = 1")?;
            let err = Config::load(Some(Path::new("reel.ini"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));

            jail.create_file("zero.toml", "concurrency = 0")?;
            let err = Config::load(Some(Path::new("zero.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid(_)));

            jail.create_file("typo.toml", "concurrency = \"lots\"")?;
            let err = Config::load(Some(Path::new("typo.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid(_)));
            assert!(!err.is_retryable());
            Ok(())
        });
    }
}
