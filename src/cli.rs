use clap::{Parser, Subcommand};
use reel_identity::Fingerprint;
use reel_library::Rotation;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "reel")]
#[command(about = "Content identity and annotations for a local media library", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Log at debug level regardless of RUST_LOG.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan the library and reconcile annotations with what is on disk
    Refresh,
    /// Print the profile (size, mtime, fingerprint) of a file
    Profile { path: PathBuf },
    /// List the current paths holding the given content
    Known {
        #[arg(value_parser = parse_fingerprint)]
        fingerprint: Fingerprint,
    },
    /// Update the annotation of a file's content
    Annotate {
        path: PathBuf,
        #[arg(long)]
        like: Option<u32>,
        #[arg(long)]
        favorite: Option<bool>,
        /// Clockwise degrees: 0, 90, 180 or 270.
        #[arg(long, value_parser = parse_rotation)]
        rotation: Option<Rotation>,
        /// Replace the tags; repeat for several.
        #[arg(long = "tag")]
        tags: Vec<u64>,
    },
    /// Print a file's profile and annotation
    Show { path: PathBuf },
    /// List the most recently created media files
    Newest {
        #[arg(short, long, default_value_t = reel_library::scan::DEFAULT_NEWEST_LIMIT)]
        limit: usize,
    },
}

fn parse_fingerprint(value: &str) -> Result<Fingerprint, String> {
    value.parse::<Fingerprint>().map_err(|err| err.to_string())
}

fn parse_rotation(value: &str) -> Result<Rotation, String> {
    let degrees: u16 = value.parse().map_err(|_| format!("not a number: {value}"))?;
    Rotation::try_from(degrees).map_err(|err| err.to_string())
}
