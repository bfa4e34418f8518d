mod cli;
mod error;
mod logging;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use futures::StreamExt;
use reel_config::Config;
use reel_identity::{Fingerprint, IdentityCache, PROFILE_DIR};
use reel_library::metadata::{annotate, lookup, open_annotations};
use reel_library::{AnnotationPatch, MetadataTable, RefreshEvent, Scanner, newest, refresh};
use serde::Serialize;
use std::path::PathBuf;
use std::pin::pin;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = ?err, "Command failed");
            ExitCode::FAILURE
        },
    }
}

/// Services opened once per invocation and passed by reference.
struct Library {
    config: Config,
    identity: IdentityCache,
    table: MetadataTable,
}

impl Library {
    async fn open(config: Config) -> Result<Self> {
        let identity = IdentityCache::open(config.data_dir.join(PROFILE_DIR)).await.or_raise(|| ErrorKind::Open)?;
        let table = open_annotations(&config.data_dir).await.or_raise(|| ErrorKind::Open)?;
        Ok(Self { config, identity, table })
    }

    fn scanner(&self) -> Scanner {
        let library = &self.config.library;
        let scanner = Scanner::new(&library.roots).with_blacklist(&library.blacklist);
        if library.extensions.is_empty() { scanner } else { scanner.with_extensions(&library.extensions) }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let library = Library::open(config).await?;
    match cli.command {
        Command::Refresh => run_refresh(&library).await,
        Command::Profile { path } => {
            let profile = library.identity.try_profile(&path).await.or_raise(|| ErrorKind::Lookup)?;
            let Some(profile) = profile else {
                exn::bail!(ErrorKind::NotFound(path));
            };
            print_json(&profile)
        },
        Command::Known { fingerprint } => run_known(&library, &fingerprint).await,
        Command::Annotate { path, like, favorite, rotation, tags } => {
            let patch = AnnotationPatch {
                like_count: like,
                is_favorite: favorite,
                rotation,
                tags: (!tags.is_empty()).then_some(tags),
                ..Default::default()
            };
            let annotated =
                annotate(&library.identity, &library.table, &path, patch).await.or_raise(|| ErrorKind::Lookup)?;
            let Some((_, annotation)) = annotated else {
                exn::bail!(ErrorKind::NotFound(path));
            };
            print_json(&annotation)
        },
        Command::Show { path } => run_show(&library, path).await,
        Command::Newest { limit } => run_newest(&library, limit).await,
    }
}

async fn run_refresh(library: &Library) -> Result<()> {
    let scanner = library.scanner();
    let mut events = pin!(refresh(&scanner, &library.identity, &library.table, library.config.concurrency));
    let mut total = 0;
    let mut done: u64 = 0;
    while let Some(event) = events.next().await {
        match event.or_raise(|| ErrorKind::Refresh)? {
            RefreshEvent::Started => tracing::info!(roots = ?scanner.roots(), "Refreshing library"),
            RefreshEvent::DiscoveryComplete(found) => {
                total = found;
                tracing::info!(files = found, "Discovery complete");
            },
            RefreshEvent::Fingerprinted(file) => {
                done += 1;
                tracing::debug!(done, total, path = %file.path.display(), fingerprint = %file.fingerprint, "Fingerprinted");
            },
            RefreshEvent::Skipped(_) => done += 1,
            RefreshEvent::Reconciled(summary) => print_json(&summary)?,
            RefreshEvent::Complete => tracing::info!("Refresh complete"),
        }
    }
    Ok(())
}

async fn run_known(library: &Library, fingerprint: &Fingerprint) -> Result<()> {
    for profile in library.identity.known_paths(fingerprint).await {
        print_json(&profile)?;
    }
    Ok(())
}

async fn run_show(library: &Library, path: PathBuf) -> Result<()> {
    #[derive(Serialize)]
    struct Shown<'a> {
        profile: &'a reel_identity::FileProfile,
        annotation: Option<&'a reel_library::Annotation>,
    }

    let found = lookup(&library.identity, &library.table, &path).await.or_raise(|| ErrorKind::Lookup)?;
    let Some((profile, annotation)) = found else {
        exn::bail!(ErrorKind::NotFound(path));
    };
    print_json(&Shown { profile: &profile, annotation: annotation.as_ref() })
}

async fn run_newest(library: &Library, limit: usize) -> Result<()> {
    let scanner = library.scanner();
    let mut files = Vec::new();
    let mut walk = pin!(scanner.walk());
    while let Some(result) = walk.next().await {
        match result {
            Ok(file) => files.push(file),
            Err(err) => tracing::warn!(error = ?err, "Skipping unreadable library entry"),
        }
    }
    for file in newest(files, limit) {
        println!("{}", file.path.display());
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let line = serde_json::to_string(value).or_raise(|| ErrorKind::Output)?;
    println!("{line}");
    Ok(())
}
