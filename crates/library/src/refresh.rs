use crate::error::Result;
use crate::metadata::MetadataTable;
use crate::reconcile::{FingerprintedFile, Summary, Tracked, reconcile};
use crate::scan::{ScannedFile, Scanner};
use async_stream::stream;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use reel_identity::IdentityCache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Progress events emitted by [`refresh`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete) exactly once, with the
///    number of media files found.
/// 3. [`Fingerprinted`](Self::Fingerprinted) or [`Skipped`](Self::Skipped),
///    once per discovered file, in completion order.
/// 4. [`Reconciled`](Self::Reconciled) exactly once.
/// 5. [`Complete`](Self::Complete) exactly once.
///
/// A reconciliation failure is yielded as an `Err` and ends the stream
/// without [`Complete`](Self::Complete). A walk that finds no files at all
/// reports an empty [`Summary`] without reconciling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    Started,
    DiscoveryComplete(u64),
    Fingerprinted(FingerprintedFile),
    /// The file vanished or couldn't be fingerprinted (already logged).
    Skipped(PathBuf),
    Reconciled(Summary),
    Complete,
}

/// Walk the library, resolve every file through the identity cache (at most
/// `concurrency` at a time) and reconcile the result against `table`.
///
/// Unreadable directories and files are logged and left out; they never end
/// the stream.
pub fn refresh<'a, V>(
    scanner: &'a Scanner,
    identity: &'a IdentityCache,
    table: &'a MetadataTable<V>,
    concurrency: usize,
) -> impl Stream<Item = Result<RefreshEvent>> + 'a
where
    V: Tracked + Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static,
{
    stream!({
        yield Ok(RefreshEvent::Started);

        let mut files: Vec<ScannedFile> = Vec::new();
        for await result in scanner.walk() {
            match result {
                Ok(file) => files.push(file),
                Err(err) => tracing::warn!(error = ?err, "Skipping unreadable library entry"),
            }
        }
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        yield Ok(RefreshEvent::DiscoveryComplete(u64::try_from(files.len()).unwrap_or(0)));

        // Most likely an unmounted or missing volume rather than an empty
        // library: leave the metadata alone.
        if files.is_empty() {
            tracing::warn!(roots = ?scanner.roots(), "No media files found; skipping reconciliation");
            yield Ok(RefreshEvent::Reconciled(Summary::default()));
            yield Ok(RefreshEvent::Complete);
            return;
        }

        // Results are slotted back by discovery position so that "first file
        // wins" in reconciliation follows walk order, not completion order.
        let mut resolved: Vec<Option<FingerprintedFile>> = vec![None; files.len()];
        let mut queue = files.into_iter().enumerate().map(|(position, file)| async move {
            let profile = identity.try_profile(&file.path).await;
            (position, file.path, profile)
        });
        let mut processing = FuturesUnordered::new();
        processing.extend(queue.by_ref().take(concurrency.max(1)));
        while let Some((position, path, profile)) = processing.next().await {
            match profile {
                Ok(Some(profile)) => {
                    let file = FingerprintedFile { path, fingerprint: profile.fingerprint };
                    resolved[position] = Some(file.clone());
                    yield Ok(RefreshEvent::Fingerprinted(file));
                },
                Ok(None) => {
                    tracing::warn!(path = %path.display(), "File disappeared during refresh");
                    yield Ok(RefreshEvent::Skipped(path));
                },
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = ?err, "Could not fingerprint file");
                    yield Ok(RefreshEvent::Skipped(path));
                },
            }
            if let Some(next) = queue.next() {
                processing.push(next);
            }
        }

        let resolved: Vec<FingerprintedFile> = resolved.into_iter().flatten().collect();
        match reconcile(&resolved, table).await {
            Ok(summary) => yield Ok(RefreshEvent::Reconciled(summary)),
            Err(err) => {
                yield Err(err);
                return;
            },
        }

        yield Ok(RefreshEvent::Complete);
    })
}
